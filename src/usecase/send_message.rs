//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - メッセージ送信処理（入力検証、永続化、Room 全体への配信）
//!
//! ### なぜこのテストが必要か
//! - 永続化されたレコード（ストア採番の ID・タイムスタンプ）が配信されることを確認
//! - 送信者自身も配信対象に含まれることを保証（永続化の確認応答を兼ねる）
//! - 検証エラー・ストア障害時に何も永続化・配信されないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：メッセージ送信と Room 全体への配信
//! - 異常系：空白のみ・長すぎる内容の拒否
//! - 異常系：ストア障害

use std::sync::Arc;

use crate::domain::{ChatEvent, Message, MessageContent, MessageRepository, RoomId, Username};
use crate::infrastructure::fanout::Broadcaster;

use super::error::SendMessageError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    /// Repository（メッセージ永続化ストアの抽象化）
    repository: Arc<dyn MessageRepository>,
    /// Broadcaster（Room への配信エンジン）
    broadcaster: Arc<Broadcaster>,
}

impl SendMessageUseCase {
    /// 新しい SendMessageUseCase を作成
    pub fn new(repository: Arc<dyn MessageRepository>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            repository,
            broadcaster,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Arguments
    ///
    /// * `room_id` - 送信先の Room（接続のクエリパラメータ由来）
    /// * `username` - 送信者のユーザー名（接続のクエリパラメータ由来）
    /// * `content` - クライアントが送ってきた生の本文
    ///
    /// # Returns
    ///
    /// * `Ok(Message)` - 永続化されたメッセージ（配信済み）
    /// * `Err(SendMessageError)` - 検証エラーまたはストア障害（何も配信されない）
    pub async fn execute(
        &self,
        room_id: RoomId,
        username: Username,
        content: String,
    ) -> Result<Message, SendMessageError> {
        // 1. 入力検証（失敗時は何も永続化・配信しない）
        let content = MessageContent::new(content)?;

        // 2. ストアへ永続化（ID とタイムスタンプはストアが採番）
        let message = self
            .repository
            .create_message(room_id.clone(), username, content)
            .await?;

        // 3. 永続化されたレコードを Room 全体へ配信（送信者を含む）
        let event = ChatEvent::message(&message);
        self.broadcaster.broadcast(&room_id, &event, None).await;

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::FixedClock;
    use crate::domain::{
        MockMessageRepository, RepositoryError, Timestamp, ValueObjectError,
    };
    use crate::infrastructure::registry::{ConnectionHandle, RoomRegistry};
    use crate::infrastructure::repository::InMemoryMessageRepository;
    use tokio::sync::mpsc;

    fn create_connection(
        room: &str,
        username: &str,
    ) -> (ConnectionHandle, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = ConnectionHandle::new(
            RoomId::new(room.to_string()).unwrap(),
            Username::new(username.to_string()).unwrap(),
            tx,
            Timestamp::new(1000),
        );
        (handle, rx)
    }

    fn parse(frame: &str) -> serde_json::Value {
        serde_json::from_str(frame).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn user(name: &str) -> Username {
        Username::new(name.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_send_message_persists_and_broadcasts_to_all() {
        // テスト項目: 1 件永続化され、送信者を含む全接続に配信される
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let repository = Arc::new(InMemoryMessageRepository::new(Arc::new(FixedClock::new(
            1672531200000,
        ))));
        let usecase = SendMessageUseCase::new(repository.clone(), broadcaster);
        let (alice, mut alice_rx) = create_connection("general", "alice");
        let (bob, mut bob_rx) = create_connection("general", "bob");
        registry.join(alice.clone()).await;
        registry.join(bob.clone()).await;

        // when (操作): alice がメッセージを送信
        let result = usecase
            .execute(room("general"), user("alice"), "hello".to_string())
            .await;

        // then (期待する結果):
        let message = result.unwrap();

        // ストアには 1 件だけ永続化されている
        let stored = repository
            .get_recent_messages(&room("general"), 100)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], message);

        // 送信者 alice 自身にも届く（永続化の確認応答を兼ねる）
        for rx in [&mut alice_rx, &mut bob_rx] {
            let frame = parse(&rx.recv().await.unwrap());
            assert_eq!(frame["type"], "message");
            assert_eq!(frame["messageId"], message.message_id.to_string());
            assert_eq!(frame["content"], "hello");
            assert_eq!(frame["username"], "alice");
            assert_eq!(frame["roomId"], "general");
        }
    }

    #[tokio::test]
    async fn test_whitespace_only_content_is_rejected() {
        // テスト項目: 空白のみの本文は検証エラーになり、何も永続化・配信されない
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let repository = Arc::new(InMemoryMessageRepository::new(Arc::new(FixedClock::new(
            2000,
        ))));
        let usecase = SendMessageUseCase::new(repository.clone(), broadcaster);
        let (alice, mut alice_rx) = create_connection("general", "alice");
        registry.join(alice.clone()).await;

        // when (操作):
        let result = usecase
            .execute(room("general"), user("alice"), "   \t ".to_string())
            .await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(SendMessageError::Validation(
                ValueObjectError::MessageContentEmpty
            ))
        );
        let stored = repository
            .get_recent_messages(&room("general"), 100)
            .await
            .unwrap();
        assert!(stored.is_empty());
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_oversized_content_is_rejected() {
        // テスト項目: 1001 文字の本文は検証エラーになる
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let repository = Arc::new(InMemoryMessageRepository::new(Arc::new(FixedClock::new(
            2000,
        ))));
        let usecase = SendMessageUseCase::new(repository.clone(), broadcaster);

        // when (操作):
        let result = usecase
            .execute(room("general"), user("alice"), "a".repeat(1001))
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::Validation(_))));
        let stored = repository
            .get_recent_messages(&room("general"), 100)
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_is_surfaced_and_nothing_broadcast() {
        // テスト項目: ストア障害はエラーとして返り、他の接続には何も配信されない
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let mut repository = MockMessageRepository::new();
        repository
            .expect_create_message()
            .returning(|_, _, _| Err(RepositoryError::Storage("db down".to_string())));
        let usecase = SendMessageUseCase::new(Arc::new(repository), broadcaster);
        let (alice, mut alice_rx) = create_connection("general", "alice");
        let (bob, mut bob_rx) = create_connection("general", "bob");
        registry.join(alice.clone()).await;
        registry.join(bob.clone()).await;

        // when (操作):
        let result = usecase
            .execute(room("general"), user("alice"), "hello".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SendMessageError::Storage(_))));
        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());

        // Room の membership は影響を受けない
        assert_eq!(registry.connection_count(&room("general")).await, 2);
    }
}

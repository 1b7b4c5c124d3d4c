//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() メソッド
//! - 接続処理（Registry への登録、user_joined 通知、スナップショット送信）
//!
//! ### なぜこのテストが必要か
//! - 既存の参加者に新規参加が通知されることを保証（自分自身は除外）
//! - 新規接続が履歴 → プレゼンスの順でスナップショットを受け取ることを確認
//! - 履歴取得に失敗した場合のエラーハンドリングを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：2 人目の参加者の接続
//! - 正常系：履歴のある Room への接続
//! - 異常系：ストア障害による履歴取得の失敗

use std::sync::Arc;

use crate::domain::{ChatEvent, MessageRepository};
use crate::infrastructure::fanout::Broadcaster;
use crate::infrastructure::registry::{ConnectionHandle, RoomRegistry};

use super::error::ConnectError;

/// 接続時に新規参加者へ送る履歴の件数
pub const JOIN_HISTORY_LIMIT: usize = 20;

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Registry（Room ごとの接続とプレゼンス）
    registry: Arc<RoomRegistry>,
    /// Repository（メッセージ永続化ストアの抽象化）
    repository: Arc<dyn MessageRepository>,
    /// Broadcaster（Room への配信エンジン）
    broadcaster: Arc<Broadcaster>,
}

impl ConnectParticipantUseCase {
    /// 新しい ConnectParticipantUseCase を作成
    pub fn new(
        registry: Arc<RoomRegistry>,
        repository: Arc<dyn MessageRepository>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            registry,
            repository,
            broadcaster,
        }
    }

    /// 参加者接続を実行
    ///
    /// # Arguments
    ///
    /// * `handle` - 受け付けた接続のハンドル
    ///
    /// # Returns
    ///
    /// * `Ok(())` - 接続処理完了
    /// * `Err(ConnectError)` - 履歴取得またはスナップショット送信の失敗
    pub async fn execute(&self, handle: ConnectionHandle) -> Result<(), ConnectError> {
        // 1. Registry に接続を登録（Room は必要に応じて作成される）
        self.registry.join(handle.clone()).await;
        tracing::info!(
            "User '{}' connected to room '{}'",
            handle.username(),
            handle.room_id()
        );

        // 2. 既存の参加者に user_joined を通知（自分自身は除外）
        let users_online = self.registry.online_users(handle.room_id()).await;
        let joined = ChatEvent::user_joined(handle.username(), users_online);
        self.broadcaster
            .broadcast(handle.room_id(), &joined, Some(handle.id()))
            .await;

        // 3. 新規接続にのみ履歴とプレゼンスのスナップショットを送る
        let history = self
            .repository
            .get_recent_messages(handle.room_id(), JOIN_HISTORY_LIMIT)
            .await?;
        self.broadcaster
            .send_to(&handle, &ChatEvent::history(&history))
            .await?;

        let users_online = self.registry.online_users(handle.room_id()).await;
        self.broadcaster
            .send_to(&handle, &ChatEvent::users_online(users_online))
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::time::FixedClock;
    use crate::domain::{
        MessageContent, MockMessageRepository, RepositoryError, RoomId, Timestamp, Username,
    };
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

    fn create_usecase(
        registry: Arc<RoomRegistry>,
        repository: Arc<dyn MessageRepository>,
    ) -> ConnectParticipantUseCase {
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        ConnectParticipantUseCase::new(registry, repository, broadcaster)
    }

    #[tokio::test]
    async fn test_connect_sends_snapshot_to_new_connection_only() {
        // テスト項目: 新規接続が history → users_online の順で受信する
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let repository = Arc::new(InMemoryMessageRepository::new(Arc::new(FixedClock::new(
            2000,
        ))));
        repository
            .create_message(
                RoomId::new("general".to_string()).unwrap(),
                Username::new("bob".to_string()).unwrap(),
                MessageContent::new("earlier".to_string()).unwrap(),
            )
            .await
            .unwrap();
        let usecase = create_usecase(registry.clone(), repository);
        let (alice, mut alice_rx) = create_connection("general", "alice");

        // when (操作):
        let result = usecase.execute(alice.clone()).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(registry.connection_count(alice.room_id()).await, 1);

        let history = parse(&alice_rx.recv().await.unwrap());
        assert_eq!(history["type"], "history");
        assert_eq!(history["messages"].as_array().unwrap().len(), 1);
        assert_eq!(history["messages"][0]["content"], "earlier");

        let users = parse(&alice_rx.recv().await.unwrap());
        assert_eq!(users["type"], "users_online");
        assert_eq!(users["users"], serde_json::json!(["alice"]));
    }

    #[tokio::test]
    async fn test_connect_announces_join_to_existing_participants() {
        // テスト項目: 既存の参加者に user_joined が届き、本人には届かない
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let repository = Arc::new(InMemoryMessageRepository::new(Arc::new(FixedClock::new(
            2000,
        ))));
        let usecase = create_usecase(registry.clone(), repository);
        let (bob, mut bob_rx) = create_connection("general", "bob");
        usecase.execute(bob.clone()).await.unwrap();
        // bob 自身のスナップショットを読み捨てる
        bob_rx.recv().await.unwrap();
        bob_rx.recv().await.unwrap();

        // when (操作): alice が接続する
        let (alice, mut alice_rx) = create_connection("general", "alice");
        usecase.execute(alice.clone()).await.unwrap();

        // then (期待する結果): bob には user_joined が届く
        let joined = parse(&bob_rx.recv().await.unwrap());
        assert_eq!(joined["type"], "user_joined");
        assert_eq!(joined["username"], "alice");
        assert_eq!(joined["usersOnline"], serde_json::json!(["alice", "bob"]));

        // alice の最初のフレームは history（user_joined は届かない）
        let first = parse(&alice_rx.recv().await.unwrap());
        assert_eq!(first["type"], "history");
    }

    #[tokio::test]
    async fn test_connect_storage_failure_is_surfaced() {
        // テスト項目: 履歴取得に失敗した場合 ConnectError::Storage が返る
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let mut repository = MockMessageRepository::new();
        repository
            .expect_get_recent_messages()
            .returning(|_, _| Err(RepositoryError::Storage("db down".to_string())));
        let usecase = create_usecase(registry.clone(), Arc::new(repository));
        let (alice, _alice_rx) = create_connection("general", "alice");

        // when (操作):
        let result = usecase.execute(alice).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectError::Storage(_))));
    }
}

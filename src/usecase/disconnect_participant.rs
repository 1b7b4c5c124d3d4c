//! UseCase: 参加者切断処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectParticipantUseCase::execute() メソッド
//! - 切断処理（Registry からの削除、user_left 通知、冪等性）
//!
//! ### なぜこのテストが必要か
//! - 切断は複数の契機（クライアント切断・読み取りエラー・heartbeat 失敗）から
//!   発火するため、二重実行しても通知が重複しないことを保証する必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：参加者の切断と残りの参加者への通知
//! - エッジケース：heartbeat による除去と競合した二重切断

use std::sync::Arc;

use crate::infrastructure::fanout::Broadcaster;
use crate::infrastructure::registry::ConnectionHandle;

/// 参加者切断のユースケース
///
/// 実体は Broadcaster の teardown（Registry からの削除 + ベストエフォートの
/// user_left 通知）への委譲。teardown は leave の戻り値でガードされており、
/// どの契機から何度呼ばれても観測可能な効果は接続ごとに 1 回きり。
pub struct DisconnectParticipantUseCase {
    /// Broadcaster（teardown 経路の持ち主）
    broadcaster: Arc<Broadcaster>,
}

impl DisconnectParticipantUseCase {
    /// 新しい DisconnectParticipantUseCase を作成
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }

    /// 参加者切断を実行
    ///
    /// # Arguments
    ///
    /// * `handle` - 切断する接続のハンドル
    ///
    /// # Returns
    ///
    /// 接続がまだ登録されていて、この呼び出しで除去された場合に `true`
    pub async fn execute(&self, handle: ConnectionHandle) -> bool {
        let evicted = self.broadcaster.teardown(handle).await;
        if !evicted {
            tracing::debug!("Connection was already removed; nothing to do");
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RoomId, Timestamp, Username};
    use crate::infrastructure::registry::RoomRegistry;
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

    #[tokio::test]
    async fn test_disconnect_notifies_remaining_participants() {
        // テスト項目: 切断すると残りの参加者に user_left が届く
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let usecase = DisconnectParticipantUseCase::new(broadcaster);
        let (alice, mut alice_rx) = create_connection("general", "alice");
        let (bob, _bob_rx) = create_connection("general", "bob");
        registry.join(alice.clone()).await;
        registry.join(bob.clone()).await;

        // when (操作):
        let evicted = usecase.execute(bob.clone()).await;

        // then (期待する結果):
        assert!(evicted);
        assert_eq!(registry.connection_count(bob.room_id()).await, 1);

        let left: serde_json::Value =
            serde_json::from_str(&alice_rx.recv().await.unwrap()).unwrap();
        assert_eq!(left["type"], "user_left");
        assert_eq!(left["username"], "bob");
        assert_eq!(left["usersOnline"], serde_json::json!(["alice"]));
    }

    #[tokio::test]
    async fn test_double_disconnect_has_no_additional_effect() {
        // テスト項目: 二度目の切断は false を返し、追加の通知も出ない
        // given (前提条件):
        let registry = Arc::new(RoomRegistry::new());
        let broadcaster = Arc::new(Broadcaster::new(registry.clone()));
        let usecase = DisconnectParticipantUseCase::new(broadcaster);
        let (alice, mut alice_rx) = create_connection("general", "alice");
        let (bob, _bob_rx) = create_connection("general", "bob");
        registry.join(alice.clone()).await;
        registry.join(bob.clone()).await;

        // when (操作):
        let first = usecase.execute(bob.clone()).await;
        let second = usecase.execute(bob).await;

        // then (期待する結果):
        assert!(first);
        assert!(!second);
        alice_rx.recv().await.unwrap(); // 1 回目の user_left
        assert!(alice_rx.try_recv().is_err());
    }
}

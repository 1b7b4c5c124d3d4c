//! Room fan-out engine.
//!
//! ## 責務
//!
//! - Room 宛てイベントの一括配信（シリアライズは 1 回、送信失敗は接続単位で隔離）
//! - 新規接続への 1 対 1 送信（履歴・プレゼンスのスナップショット）
//! - 死んだ接続の teardown（Registry からの削除と user_left の通知）
//!
//! ## 設計ノート
//!
//! 配信は Registry のスナップショットに対して行います。スナップショット取得後の
//! join / leave は進行中の配信に影響せず、次回以降の配信にのみ反映されます。
//!
//! teardown は再帰ではなくワークキューで実装しています。user_left の通知自体が
//! 失敗した接続はキューに積まれ、leave の戻り値（登録されていたかどうか）が
//! 各接続の teardown を 1 回きりに抑えます。

use std::sync::Arc;

use crate::domain::{ChatEvent, PushError, RoomId};

use super::registry::{ConnectionHandle, ConnectionId, RoomRegistry};

/// Fans chat events out to room members, isolating per-connection failures.
pub struct Broadcaster {
    registry: Arc<RoomRegistry>,
}

impl Broadcaster {
    /// Create a new Broadcaster over the shared registry
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver an event to every connection currently registered in the room.
    ///
    /// The event is serialized once. A send failure on one connection never
    /// aborts delivery to the others and never propagates to the caller;
    /// every failed connection goes through [`Broadcaster::teardown`].
    pub async fn broadcast(
        &self,
        room_id: &RoomId,
        event: &ChatEvent,
        exclude: Option<ConnectionId>,
    ) {
        let payload = serde_json::to_string(event).unwrap();
        let broken = self.deliver(room_id, &payload, exclude).await;
        for handle in broken {
            self.teardown(handle).await;
        }
    }

    /// Deliver an event to a single connection (history / presence snapshot)
    pub async fn send_to(
        &self,
        handle: &ConnectionHandle,
        event: &ChatEvent,
    ) -> Result<(), PushError> {
        let payload = serde_json::to_string(event).unwrap();
        handle.send(&payload)
    }

    /// Remove a connection and announce its departure.
    ///
    /// The shared teardown path for every trigger: client close, read error,
    /// broadcast failure and heartbeat failure. Guarded by the registry's
    /// `leave` result, so running it twice for the same connection has no
    /// additional observable effect. Returns whether `handle` was still
    /// registered.
    pub async fn teardown(&self, handle: ConnectionHandle) -> bool {
        let mut evicted = false;
        let mut queue = vec![handle.clone()];
        while let Some(current) = queue.pop() {
            let removed = self
                .registry
                .leave(current.room_id(), current.username(), current.id())
                .await;
            if !removed {
                continue;
            }
            if current.id() == handle.id() {
                evicted = true;
            }
            tracing::info!(
                "User '{}' disconnected from room '{}'",
                current.username(),
                current.room_id()
            );

            // Best effort: a failed departure announcement must not prevent
            // the eviction, and failing receivers join the queue instead of
            // recursing.
            let users_online = self.registry.online_users(current.room_id()).await;
            let event = ChatEvent::user_left(current.username(), users_online);
            let payload = serde_json::to_string(&event).unwrap();
            let broken = self.deliver(current.room_id(), &payload, None).await;
            queue.extend(broken);
        }
        evicted
    }

    /// Send a serialized payload to the room's current membership snapshot,
    /// returning the connections whose send failed.
    async fn deliver(
        &self,
        room_id: &RoomId,
        payload: &str,
        exclude: Option<ConnectionId>,
    ) -> Vec<ConnectionHandle> {
        let targets = self.registry.connections(room_id).await;
        let mut broken = Vec::new();
        for handle in targets {
            if exclude == Some(handle.id()) {
                continue;
            }
            if let Err(e) = handle.send(payload) {
                tracing::warn!(
                    "Failed to send to '{}' in room '{}': {}",
                    handle.username(),
                    room_id,
                    e
                );
                broken.push(handle);
            }
        }
        broken
    }
}

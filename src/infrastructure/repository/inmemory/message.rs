//! InMemory Message Repository 実装
//!
//! ドメイン層が定義する MessageRepository trait の具体的な実装。
//! HashMap をインメモリ DB として使用します。
//!
//! ## 技術的負債
//!
//! メッセージを Room ごとの Vec に無制限に蓄積しています。インメモリ実装では
//! 許容される妥協ですが、PostgreSQL などの DBMS を実装する際はページングと
//! 保持期間の管理が必要になります。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::common::time::Clock;
use crate::domain::{
    Message, MessageContent, MessageRepository, RepositoryError, RoomId, Timestamp, Username,
};

/// インメモリ Message Repository 実装
///
/// Room ごとのメッセージ履歴を挿入順に保持します。メッセージ ID とタイムスタンプは
/// このストアが採番します（依存性の逆転）。
pub struct InMemoryMessageRepository {
    /// Room ごとのメッセージ履歴（挿入順 = 時系列順）
    messages: Mutex<HashMap<RoomId, Vec<Message>>>,
    /// タイムスタンプ採番用の Clock
    clock: Arc<dyn Clock>,
}

impl InMemoryMessageRepository {
    /// 新しい InMemoryMessageRepository を作成
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            messages: Mutex::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn create_message(
        &self,
        room_id: RoomId,
        username: Username,
        content: MessageContent,
    ) -> Result<Message, RepositoryError> {
        let message = Message::new(
            Uuid::new_v4(),
            content,
            username,
            room_id.clone(),
            Timestamp::new(self.clock.now_millis()),
        );

        let mut messages = self.messages.lock().await;
        messages.entry(room_id).or_default().push(message.clone());

        Ok(message)
    }

    async fn get_recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<Message>, RepositoryError> {
        let messages = self.messages.lock().await;
        let Some(room_messages) = messages.get(room_id) else {
            return Ok(Vec::new());
        };
        let skip = room_messages.len().saturating_sub(limit);
        Ok(room_messages[skip..].to_vec())
    }
}

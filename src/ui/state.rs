//! Server state and connection query parameters.

use serde::Deserialize;
use std::sync::Arc;

use crate::common::time::Clock;
use crate::infrastructure::registry::RoomRegistry;
use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetHistoryUseCase, SendMessageUseCase,
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    /// Display name, defaults to "Anonymous"
    #[serde(default = "default_username")]
    pub username: String,
    /// Room to join, defaults to "general"
    #[serde(default = "default_room")]
    pub room: String,
}

fn default_username() -> String {
    "Anonymous".to_string()
}

fn default_room() -> String {
    "general".to_string()
}

/// Shared application state
pub struct AppState {
    /// Registry（Room ごとの接続とプレゼンス）
    pub registry: Arc<RoomRegistry>,
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    pub disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// GetHistoryUseCase（履歴取得のユースケース）
    pub get_history_usecase: Arc<GetHistoryUseCase>,
    /// Clock（接続時刻の採番用）
    pub clock: Arc<dyn Clock>,
}

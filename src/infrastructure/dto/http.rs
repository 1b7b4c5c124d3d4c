//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::MessagePayload;

/// Response body of the room history endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageListResponse {
    pub messages: Vec<MessagePayload>,
    pub total: usize,
}

/// Response body of the room user listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUsersResponse {
    pub room_id: String,
    pub users_online: Vec<String>,
    pub connection_count: usize,
}

/// One entry of the active room listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummaryDto {
    pub room_id: String,
    pub connection_count: usize,
    pub users_online: Vec<String>,
}

/// Response body of the active room listing endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveRoomsResponse {
    pub active_rooms: Vec<RoomSummaryDto>,
    pub total_rooms: usize,
}

//! HTTP API endpoint handlers.
//!
//! These endpoints perform no coordination of their own; they delegate to
//! the registry's accessors and the message store.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    domain::{MessagePayload, RoomId, Username},
    infrastructure::dto::http::{
        ActiveRoomsResponse, MessageListResponse, RoomSummaryDto, RoomUsersResponse,
    },
    ui::state::AppState,
};

/// Query parameters for the history endpoint
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Number of messages to return, defaults to 50, bounded to 1..=100
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    50
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Get recent messages of a room, oldest first
pub async fn get_chat_history(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<MessageListResponse>, StatusCode> {
    if !(1..=100).contains(&query.limit) {
        return Err(StatusCode::BAD_REQUEST);
    }
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    let messages = state
        .get_history_usecase
        .execute(&room_id, query.limit)
        .await
        .map_err(|e| {
            tracing::error!("Failed to load history for room '{}': {}", room_id, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let messages: Vec<MessagePayload> = messages.iter().map(MessagePayload::from).collect();
    Ok(Json(MessageListResponse {
        total: messages.len(),
        messages,
    }))
}

/// Get usernames and connection count of a room
pub async fn get_room_users(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomUsersResponse>, StatusCode> {
    let room_id = RoomId::new(room_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    let users_online = state.registry.online_users(&room_id).await;
    let connection_count = state.registry.connection_count(&room_id).await;

    Ok(Json(RoomUsersResponse {
        room_id: room_id.into_string(),
        users_online: users_online
            .into_iter()
            .map(Username::into_string)
            .collect(),
        connection_count,
    }))
}

/// Get all rooms with at least one live connection
pub async fn get_active_rooms(State(state): State<Arc<AppState>>) -> Json<ActiveRoomsResponse> {
    let rooms = state.registry.active_rooms().await;

    let active_rooms: Vec<RoomSummaryDto> = rooms
        .into_iter()
        .map(|room| RoomSummaryDto {
            room_id: room.room_id.into_string(),
            connection_count: room.connection_count,
            users_online: room
                .users_online
                .into_iter()
                .map(Username::into_string)
                .collect(),
        })
        .collect();

    Json(ActiveRoomsResponse {
        total_rooms: active_rooms.len(),
        active_rooms,
    })
}

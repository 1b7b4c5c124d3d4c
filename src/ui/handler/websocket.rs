//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{RoomId, Timestamp, Username},
    infrastructure::dto::websocket::{FRAME_TYPE_MESSAGE, InboundFrame},
    infrastructure::registry::ConnectionHandle,
    ui::state::{AppState, ConnectQuery},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    // Convert String -> Username / RoomId (Domain Model)
    let username = match Username::new(query.username.clone()) {
        Ok(name) => name,
        Err(e) => {
            tracing::warn!("Invalid username '{}': {}", query.username, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };
    let room_id = match RoomId::new(query.room.clone()) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Invalid room '{}': {}", query.room, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, username)))
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    room_id: RoomId,
    username: Username,
) {
    let (mut sender, mut receiver) = socket.split();

    // Create a channel for this connection to receive outbound frames
    let (tx, mut rx) = mpsc::unbounded_channel();
    let connected_at = Timestamp::new(state.clock.now_millis());
    let handle = ConnectionHandle::new(room_id.clone(), username.clone(), tx, connected_at);

    // Register, announce the join and send the history/presence snapshot
    if let Err(e) = state
        .connect_participant_usecase
        .execute(handle.clone())
        .await
    {
        tracing::error!(
            "Failed to initialize session for '{}' in room '{}': {}",
            username,
            room_id,
            e
        );
        state.disconnect_participant_usecase.execute(handle).await;
        return;
    }

    let state_recv = state.clone();
    let recv_room = room_id.clone();
    let recv_username = username.clone();

    // Task reading inbound frames from this connection, in order
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::error!("WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let frame = match serde_json::from_str::<InboundFrame>(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::debug!("Ignoring unparseable frame: {}", e);
                            continue;
                        }
                    };
                    if frame.r#type != FRAME_TYPE_MESSAGE {
                        tracing::debug!("Ignoring frame of type '{}'", frame.r#type);
                        continue;
                    }
                    let content = frame.content.unwrap_or_default();

                    // Validation and storage failures stay local to this
                    // connection; the reference behavior sends no error frame.
                    match state_recv
                        .send_message_usecase
                        .execute(recv_room.clone(), recv_username.clone(), content)
                        .await
                    {
                        Ok(message) => {
                            tracing::debug!("Message {} persisted and broadcast", message.message_id);
                        }
                        Err(e) => {
                            tracing::warn!(
                                "Failed to process message from '{}' in room '{}': {}",
                                recv_username,
                                recv_room,
                                e
                            );
                        }
                    }
                }
                Message::Ping(_) => {
                    tracing::debug!("Received ping");
                    // Ping/pong is handled automatically by the WebSocket protocol
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", recv_username);
                    break;
                }
                _ => {}
            }
        }
    });

    // Task forwarding queued outbound frames to this connection
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Shared teardown path; a no-op if the heartbeat already evicted us
    state.disconnect_participant_usecase.execute(handle).await;
}

//! Server execution logic.

use std::sync::Arc;

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::common::time::Clock;
use crate::infrastructure::registry::RoomRegistry;
use crate::usecase::{
    ConnectParticipantUseCase, DisconnectParticipantUseCase, GetHistoryUseCase, SendMessageUseCase,
};

use super::{
    handler::{
        get_active_rooms, get_chat_history, get_room_users, health_check, websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket chat server
///
/// This struct encapsulates the server configuration and provides methods to run the server.
///
/// # Example
///
/// ```ignore
/// let server = Server::new(
///     registry,
///     connect_participant_usecase,
///     disconnect_participant_usecase,
///     send_message_usecase,
///     get_history_usecase,
///     clock,
/// );
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    /// Registry（Room ごとの接続とプレゼンス）
    registry: Arc<RoomRegistry>,
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// DisconnectParticipantUseCase（参加者切断のユースケース）
    disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    send_message_usecase: Arc<SendMessageUseCase>,
    /// GetHistoryUseCase（履歴取得のユースケース）
    get_history_usecase: Arc<GetHistoryUseCase>,
    /// Clock（接続時刻の採番用）
    clock: Arc<dyn Clock>,
}

impl Server {
    /// Create a new Server instance
    pub fn new(
        registry: Arc<RoomRegistry>,
        connect_participant_usecase: Arc<ConnectParticipantUseCase>,
        disconnect_participant_usecase: Arc<DisconnectParticipantUseCase>,
        send_message_usecase: Arc<SendMessageUseCase>,
        get_history_usecase: Arc<GetHistoryUseCase>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            connect_participant_usecase,
            disconnect_participant_usecase,
            send_message_usecase,
            get_history_usecase,
            clock,
        }
    }

    /// Run the WebSocket chat server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener (used by tests with an ephemeral port)
    pub async fn serve(self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        let app_state = Arc::new(AppState {
            registry: self.registry,
            connect_participant_usecase: self.connect_participant_usecase,
            disconnect_participant_usecase: self.disconnect_participant_usecase,
            send_message_usecase: self.send_message_usecase,
            get_history_usecase: self.get_history_usecase,
            clock: self.clock,
        });

        // Define handlers
        let app = Router::new()
            // WebSocket エンドポイント
            .route("/chat/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/chat/history/{room_id}", get(get_chat_history))
            .route("/chat/rooms", get(get_active_rooms))
            .route("/chat/rooms/{room_id}/users", get(get_room_users))
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(app_state);

        let local_addr = listener.local_addr()?;
        tracing::info!("WebSocket chat server listening on {}", local_addr);
        tracing::info!("Connect to: ws://{}/chat/ws", local_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        // Set up graceful shutdown signal handler
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}

//! Room-based WebSocket chat server with presence tracking and heartbeats.
//!
//! Receives chat messages from clients, persists them and broadcasts them to
//! every connection in the sender's room.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin server
//! cargo run --bin server -- --host 0.0.0.0 --port 3000
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use hiroba::{
    common::{logger::setup_logger, time::SystemClock},
    infrastructure::{
        fanout::Broadcaster, heartbeat::HeartbeatLoop, registry::RoomRegistry,
        repository::InMemoryMessageRepository,
    },
    ui::Server,
    usecase::{
        ConnectParticipantUseCase, DisconnectParticipantUseCase, GetHistoryUseCase,
        SendMessageUseCase,
    },
};

#[derive(Parser, Debug)]
#[command(name = "server")]
#[command(about = "Room-based WebSocket chat server with heartbeats", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Heartbeat interval in seconds
    #[arg(long, default_value = "30")]
    heartbeat_interval: u64,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    // Initialize dependencies in order:
    // 1. Clock, Registry, Repository
    // 2. Broadcaster
    // 3. UseCases
    // 4. Heartbeat loop
    // 5. Server

    // 1. Create shared runtime state
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(RoomRegistry::new());
    let repository = Arc::new(InMemoryMessageRepository::new(clock.clone()));

    // 2. Create the fan-out engine over the registry
    let broadcaster = Arc::new(Broadcaster::new(registry.clone()));

    // 3. Create UseCases
    let connect_participant_usecase = Arc::new(ConnectParticipantUseCase::new(
        registry.clone(),
        repository.clone(),
        broadcaster.clone(),
    ));
    let disconnect_participant_usecase =
        Arc::new(DisconnectParticipantUseCase::new(broadcaster.clone()));
    let send_message_usecase = Arc::new(SendMessageUseCase::new(
        repository.clone(),
        broadcaster.clone(),
    ));
    let get_history_usecase = Arc::new(GetHistoryUseCase::new(repository.clone()));

    // 4. Start the heartbeat loop
    let heartbeat = HeartbeatLoop::new(registry.clone(), broadcaster.clone(), clock.clone())
        .with_interval(Duration::from_secs(args.heartbeat_interval));
    tokio::spawn(heartbeat.run());

    // 5. Create and run the server
    let server = Server::new(
        registry,
        connect_participant_usecase,
        disconnect_participant_usecase,
        send_message_usecase,
        get_history_usecase,
        clock,
    );
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

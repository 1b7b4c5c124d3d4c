//! Request handlers, organized by protocol.

pub mod http;
pub mod websocket;

pub use http::{get_active_rooms, get_chat_history, get_room_users, health_check};
pub use websocket::websocket_handler;

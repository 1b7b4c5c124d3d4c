//! Data Transfer Objects (DTOs) for the chat server.
//!
//! DTOs are organized by protocol:
//! - `websocket`: inbound WebSocket frame DTOs
//! - `http`: HTTP API response DTOs

pub mod http;
pub mod websocket;

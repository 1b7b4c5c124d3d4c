//! Inbound WebSocket frame DTOs.

use serde::Deserialize;

/// Frame type a client uses to submit a chat message
pub const FRAME_TYPE_MESSAGE: &str = "message";

/// An inbound client frame.
///
/// Only `{"type": "message", "content": "..."}` is acted on; frames with
/// any other `type` are ignored. Room and username come from the
/// connection's query parameters, never from the frame.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub r#type: String,
    #[serde(default)]
    pub content: Option<String>,
}

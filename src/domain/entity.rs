//! Core domain models for the chat server.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::value_object::{MessageContent, RoomId, Timestamp, Username};

/// A chat message as persisted by the message store.
///
/// The store assigns `message_id` and `timestamp`; a `Message` is immutable
/// once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Store-assigned message identifier
    pub message_id: Uuid,
    /// Message content
    pub content: MessageContent,
    /// Sender's username
    pub username: Username,
    /// Room the message was sent to
    pub room_id: RoomId,
    /// Store-assigned creation timestamp
    pub timestamp: Timestamp,
}

impl Message {
    /// Create a new message record
    pub fn new(
        message_id: Uuid,
        content: MessageContent,
        username: Username,
        room_id: RoomId,
        timestamp: Timestamp,
    ) -> Self {
        Self {
            message_id,
            content,
            username,
            room_id,
            timestamp,
        }
    }
}

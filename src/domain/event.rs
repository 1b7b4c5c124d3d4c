//! Chat events broadcast to room members.
//!
//! Every frame the server emits is one case of [`ChatEvent`], serialized as
//! a JSON object with a `type` discriminator at the transport boundary.

use serde::{Deserialize, Serialize};

use crate::common::time::timestamp_to_rfc3339;

use super::{entity::Message, value_object::Username};

/// Outbound wire event.
///
/// The closed set of frames a connection can receive:
///
/// - `history` / `users_online`: one-to-one snapshot sent to a newly joined
///   connection
/// - `message`: a persisted chat message fanned out to the whole room
/// - `user_joined` / `user_left`: presence announcements
/// - `ping`: heartbeat probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    History {
        messages: Vec<MessagePayload>,
    },
    UsersOnline {
        users: Vec<String>,
    },
    Message(MessagePayload),
    #[serde(rename_all = "camelCase")]
    UserJoined {
        username: String,
        message: String,
        users_online: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    UserLeft {
        username: String,
        message: String,
        users_online: Vec<String>,
    },
    Ping,
}

impl ChatEvent {
    /// Build a `history` event from persisted messages (oldest first)
    pub fn history(messages: &[Message]) -> Self {
        Self::History {
            messages: messages.iter().map(MessagePayload::from).collect(),
        }
    }

    /// Build a `users_online` event from a presence snapshot
    pub fn users_online(users: Vec<Username>) -> Self {
        Self::UsersOnline {
            users: users.into_iter().map(Username::into_string).collect(),
        }
    }

    /// Build a `message` event from a persisted record
    pub fn message(message: &Message) -> Self {
        Self::Message(MessagePayload::from(message))
    }

    /// Build a `user_joined` announcement
    pub fn user_joined(username: &Username, users_online: Vec<Username>) -> Self {
        Self::UserJoined {
            username: username.as_str().to_string(),
            message: format!("{} joined the chat", username),
            users_online: users_online
                .into_iter()
                .map(Username::into_string)
                .collect(),
        }
    }

    /// Build a `user_left` announcement
    pub fn user_left(username: &Username, users_online: Vec<Username>) -> Self {
        Self::UserLeft {
            username: username.as_str().to_string(),
            message: format!("{} left the chat", username),
            users_online: users_online
                .into_iter()
                .map(Username::into_string)
                .collect(),
        }
    }
}

/// Wire form of a persisted [`Message`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    pub message_id: String,
    pub content: String,
    pub username: String,
    pub room_id: String,
    /// RFC 3339 creation timestamp
    pub timestamp: String,
}

impl From<&Message> for MessagePayload {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.message_id.to_string(),
            content: message.content.as_str().to_string(),
            username: message.username.as_str().to_string(),
            room_id: message.room_id.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(message.timestamp.value()),
        }
    }
}

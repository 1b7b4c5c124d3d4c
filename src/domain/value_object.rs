//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Username value object.
///
/// Represents the display name a connection joined a room under.
/// A username must be non-empty after trimming and at most 50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// Create a new Username.
    ///
    /// # Arguments
    ///
    /// * `name` - The username string
    ///
    /// # Returns
    ///
    /// A Result containing the Username or an error if validation fails
    pub fn new(name: String) -> Result<Self, ValueObjectError> {
        if name.trim().is_empty() {
            return Err(ValueObjectError::UsernameEmpty);
        }
        let len = name.chars().count();
        if len > 50 {
            return Err(ValueObjectError::UsernameTooLong {
                max: 50,
                actual: len,
            });
        }
        Ok(Self(name))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room identifier value object.
///
/// Represents the name of a chat room. A room id must be non-empty after
/// trimming and at most 50 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl RoomId {
    /// Create a new RoomId.
    ///
    /// # Arguments
    ///
    /// * `id` - The room identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the RoomId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.trim().is_empty() {
            return Err(ValueObjectError::RoomIdEmpty);
        }
        let len = id.chars().count();
        if len > 50 {
            return Err(ValueObjectError::RoomIdTooLong {
                max: 50,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message content value object.
///
/// Represents the content of a chat message. Content must be non-empty
/// after trimming and at most 1000 characters; the stored value keeps the
/// original whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent(String);

impl MessageContent {
    /// Create a new MessageContent.
    ///
    /// # Arguments
    ///
    /// * `content` - The message content string
    ///
    /// # Returns
    ///
    /// A Result containing the MessageContent or an error if validation fails
    pub fn new(content: String) -> Result<Self, ValueObjectError> {
        if content.trim().is_empty() {
            return Err(ValueObjectError::MessageContentEmpty);
        }
        let len = content.chars().count();
        if len > 1000 {
            return Err(ValueObjectError::MessageContentTooLong {
                max: 1000,
                actual: len,
            });
        }
        Ok(Self(content))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MessageContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp.
    ///
    /// # Arguments
    ///
    /// * `value` - Unix timestamp in milliseconds
    ///
    /// # Returns
    ///
    /// A Timestamp instance
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

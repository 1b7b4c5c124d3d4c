//! Domain layer error definitions.

use thiserror::Error;

/// Errors related to Value Objects validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValueObjectError {
    /// Username validation error
    #[error("Username cannot be empty")]
    UsernameEmpty,

    /// Username too long error
    #[error("Username cannot exceed {max} characters (got {actual})")]
    UsernameTooLong { max: usize, actual: usize },

    /// RoomId validation error
    #[error("RoomId cannot be empty")]
    RoomIdEmpty,

    /// RoomId too long error
    #[error("RoomId cannot exceed {max} characters (got {actual})")]
    RoomIdTooLong { max: usize, actual: usize },

    /// MessageContent validation error
    #[error("MessageContent cannot be empty")]
    MessageContentEmpty,

    /// MessageContent too long error
    #[error("MessageContent cannot exceed {max} characters (got {actual})")]
    MessageContentTooLong { max: usize, actual: usize },
}

/// Errors raised by the message store
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// Underlying storage fault
    #[error("storage operation failed: {0}")]
    Storage(String),
}

/// Errors raised when pushing a frame to a single connection
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PushError {
    /// The connection's send channel is closed (peer gone)
    #[error("connection '{0}' is closed")]
    ConnectionClosed(String),
}

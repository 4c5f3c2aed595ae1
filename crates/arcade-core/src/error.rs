//! Error types

use thiserror::Error;

/// Protocol and game-logic errors
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    #[error("Message is not a JSON object")]
    NotAnObject,

    #[error("Missing message type")]
    MissingType,

    #[error("Unknown message type: {0}")]
    UnknownType(String),

    #[error("Invalid payload for '{tag}': {reason}")]
    InvalidPayload { tag: String, reason: String },

    #[error("Invalid display name: {0}")]
    InvalidName(&'static str),

    #[error("Invalid session config: {0}")]
    InvalidConfig(String),

    #[error("Question bank is empty")]
    EmptyBank,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

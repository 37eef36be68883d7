//! Session controller error types.
//!
//! Internal details are logged; the UI layer shows `user_message()` as a
//! transient notification. Transport and device failures surface to the
//! caller of the triggering command and are not retried automatically.

use classroom_protocol::DecodeError;
use thiserror::Error;

/// Session controller error type.
#[derive(Debug, Error)]
pub enum ClassError {
    /// Remote transport call failed (login, attach, publish, property update).
    #[error("transport error: {0}")]
    Transport(String),

    /// Camera/microphone probe, open or close failed.
    #[error("device error: {0}")]
    Device(String),

    /// A wire payload could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Command requires a joined session.
    #[error("session not joined")]
    NotJoined,

    /// Both stage slots are occupied.
    #[error("stage is full")]
    StageFull,

    /// Group uuid not present in the property tree.
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Stream uuid not present in the current stream list.
    #[error("stream not found: {0}")]
    StreamNotFound(String),

    /// A join step exceeded the configured timeout.
    #[error("timed out during {0}")]
    Timeout(&'static str),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error (actor channel failures and other bugs).
    #[error("internal error: {0}")]
    Internal(String),
}

impl ClassError {
    /// Small integer code for audit logs and UI mapping.
    #[must_use]
    pub const fn error_code(&self) -> i32 {
        match self {
            ClassError::Transport(_) => 1,
            ClassError::Device(_) => 2,
            ClassError::Decode(_) => 3,
            ClassError::NotJoined => 4,
            ClassError::StageFull => 5,
            ClassError::GroupNotFound(_) | ClassError::StreamNotFound(_) => 6,
            ClassError::Timeout(_) => 7,
            ClassError::Config(_) | ClassError::Internal(_) => 8,
        }
    }

    /// User-safe message for the transient failure notification.
    ///
    /// Never exposes internal details such as endpoints or payloads.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ClassError::Transport(_) => "Connection problem, please try again".to_string(),
            ClassError::Device(_) => "Camera or microphone is unavailable".to_string(),
            ClassError::Decode(_) | ClassError::Config(_) | ClassError::Internal(_) => {
                "An internal error occurred".to_string()
            }
            ClassError::NotJoined => "You are not in the classroom".to_string(),
            ClassError::StageFull => "The stage is full".to_string(),
            ClassError::GroupNotFound(_) => "That group no longer exists".to_string(),
            ClassError::StreamNotFound(_) => "That stream is no longer live".to_string(),
            ClassError::Timeout(_) => "The classroom did not respond in time".to_string(),
        }
    }
}

impl From<DecodeError> for ClassError {
    fn from(err: DecodeError) -> Self {
        ClassError::Decode(err.to_string())
    }
}

//! FameFit core error type.
//!
//! Adapter crates return `CoreError` from port implementations so the relay
//! can treat every collaborator failure uniformly.

use thiserror::Error;

/// Core layer error.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON serialization/deserialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration value
    #[error("config error: {0}")]
    Config(String),

    /// Field validation failure
    #[error("validation failed — {field}: {message}")]
    Validation {
        /// Name of the offending field
        field: String,
        /// Reason
        message: String,
    },

    /// The device channel rejected or failed to deliver a message
    #[error("device channel error: {0}")]
    Channel(String),

    /// The paired device is not reachable
    #[error("paired device unreachable")]
    Unreachable,

    /// A channel payload is missing a key or carries the wrong type
    #[error("malformed payload — {key}: {message}")]
    Payload {
        /// Payload key
        key: String,
        /// Reason
        message: String,
    },

    /// Workout session state machine rejected a transition
    #[error("invalid session transition: {from} -> {to}")]
    InvalidTransition {
        /// Current state
        from: String,
        /// Requested state
        to: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for [`CoreError::Payload`].
    pub fn payload(key: &str, message: impl Into<String>) -> Self {
        CoreError::Payload {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

//! Structured error types for the agent protocol
//!
//! Two failure kinds exist at the process boundary: the inbound payload was
//! not parseable (`InvalidInput`) or the decision policy failed while
//! computing a response (`PolicyError`). Both are converted into an `error`
//! envelope before anything reaches stdout; a raw failure trace must never
//! be the process output.

use thiserror::Error;

/// Primary error type for protocol operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Inbound payload was not valid JSON
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The decision policy failed while computing a response
    #[error("policy error: {message}")]
    PolicyError { message: String },

    /// Envelope could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ProtocolError {
    /// Message suitable for embedding in an `error` envelope
    pub fn envelope_message(&self) -> String {
        match self {
            Self::InvalidInput { message } => format!("Invalid input JSON: {}", message),
            Self::PolicyError { message } => format!("Runner error: {}", message),
            Self::Serialization(message) => format!("Serialization error: {}", message),
        }
    }

    /// Check if the error originated in caller-supplied policy code
    pub fn is_policy_error(&self) -> bool {
        matches!(self, Self::PolicyError { .. })
    }
}

/// Convert from anyhow::Error to ProtocolError
///
/// The decision policy seam returns `anyhow::Result`, so any failure
/// crossing it becomes a `PolicyError`.
impl From<anyhow::Error> for ProtocolError {
    fn from(err: anyhow::Error) -> Self {
        Self::PolicyError {
            message: format!("{:#}", err),
        }
    }
}

/// Convert from serde_json::Error to ProtocolError
impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput {
            message: err.to_string(),
        }
    }
}

/// Result type alias using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

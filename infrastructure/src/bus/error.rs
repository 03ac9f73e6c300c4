//! Error types for the message bus

use conductor_domain::MessageValidationError;
use thiserror::Error;

/// Result type alias for bus operations
pub type Result<T> = std::result::Result<T, BusError>;

/// Errors raised by [`MessageBus`](super::MessageBus) operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BusError {
    #[error("Request {request_id} timed out after {timeout_ms} ms")]
    Timeout { request_id: String, timeout_ms: u64 },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Subscription error: {0}")]
    Subscription(String),

    #[error("Invalid message: {0}")]
    InvalidMessage(#[from] MessageValidationError),
}

impl From<serde_json::Error> for BusError {
    fn from(e: serde_json::Error) -> Self {
        BusError::Serialization(e.to_string())
    }
}

impl BusError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, BusError::Timeout { .. })
    }
}

//! Error types for nsot-sync
//!
//! [`Error`] is the crate-wide error. [`InventoryError`] is the failure
//! taxonomy every [`InventoryClient`](crate::traits::InventoryClient) must
//! surface so the engine can classify it.

use thiserror::Error;

/// Result type alias for nsot-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for nsot-sync
#[derive(Error, Debug)]
pub enum Error {
    /// Collector-related errors
    #[error("Collector error: {0}")]
    Collector(String),

    /// Inventory client errors that escaped classification
    #[error("Inventory error: {0}")]
    Inventory(#[from] InventoryError),

    /// The inventory service could not be reached; aborts the invocation
    #[error("Inventory unreachable: {0}")]
    Unreachable(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed local data (bad address, empty hostname, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Create a collector error
    pub fn collector(msg: impl Into<String>) -> Self {
        Self::Collector(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an unreachable-service error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::Unreachable(msg.into())
    }

    /// Whether this error means the whole invocation must stop
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unreachable(_) | Self::Inventory(InventoryError::Connectivity(_))
        )
    }
}

/// Failure classes an inventory client reports to the engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InventoryError {
    /// Transport failure: connection refused, DNS failure, timeout
    #[error("connection failed: {0}")]
    Connectivity(String),

    /// The service rejected the request (validation error, conflict, ...)
    #[error("request rejected (HTTP {status}): {}", rejection_message(.payload))]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error payload returned by the service
        payload: serde_json::Value,
    },

    /// Anything else: malformed response, unexpected shape
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl InventoryError {
    /// Create a connectivity error
    pub fn connectivity(msg: impl Into<String>) -> Self {
        Self::Connectivity(msg.into())
    }

    /// Create a rejection error
    pub fn rejected(status: u16, payload: serde_json::Value) -> Self {
        Self::Rejected { status, payload }
    }

    /// Create an unexpected-response error
    pub fn unexpected(msg: impl Into<String>) -> Self {
        Self::Unexpected(msg.into())
    }

    /// Human-readable message carried by the service's payload, if any
    pub fn message(&self) -> String {
        match self {
            Self::Rejected { payload, .. } => rejection_message(payload),
            Self::Connectivity(msg) | Self::Unexpected(msg) => msg.clone(),
        }
    }
}

/// Pull the message out of an NSoT error envelope (`{"error": {"message": ..}}`),
/// falling back to the payload's JSON text.
fn rejection_message(payload: &serde_json::Value) -> String {
    let message = payload
        .pointer("/error/message")
        .or_else(|| payload.get("detail"))
        .or_else(|| payload.get("message"));

    match message {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => match payload {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        },
    }
}

//! SDK error types

use thiserror::Error;

use crate::interceptors::Provider;

/// Errors that can occur in the recall SDK
#[derive(Error, Debug)]
pub enum RecallError {
    /// HTTP transport failure talking to the remote service or a provider
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Remote service answered with a non-2xx status
    #[error("remote service returned {status}: {body}")]
    Api { status: u16, body: String },

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// No interceptor registered for the provider
    #[error("no interceptor registered for provider: {0}")]
    NotRegistered(Provider),

    /// Session carries the wrong client flavor for this code path
    #[error("session client handle is {found}, expected {expected}")]
    HandleMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Error surfaced by a provider chunk stream
    #[error("provider stream error: {0}")]
    Stream(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl RecallError {
    /// Create a generic error from a string
    pub fn other(msg: impl Into<String>) -> Self {
        RecallError::Other(msg.into())
    }
}

/// Result type alias for SDK operations
pub type RecallResult<T> = Result<T, RecallError>;

//! Error types for the record store.

use thiserror::Error;

/// Errors from record store calls.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure (connect, timeout, TLS).
    #[error("store request failed: {0}")]
    Http(String),

    /// The table service answered with a non-success status.
    #[error("store returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body did not match the expected row shape.
    #[error("failed to decode store response: {0}")]
    Decode(String),

    /// An insert returned no row.
    #[error("insert returned no row")]
    EmptyInsert,

    /// An update without filters would touch every row.
    #[error("refusing to update without filters")]
    UnfilteredUpdate,
}

impl StoreError {
    /// Whether repeating the call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            StoreError::Decode(e.to_string())
        } else {
            StoreError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Decode(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

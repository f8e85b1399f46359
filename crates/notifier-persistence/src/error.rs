//! Error types for local state files.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from reading or writing local state.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Could not create a parent directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write a state file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not read a state file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another live process holds the instance lock.
    #[error("another instance is already running (pid {pid})")]
    AlreadyRunning { pid: u32 },

    /// JSON encode/decode failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for persistence operations.
pub type Result<T> = std::result::Result<T, PersistenceError>;

//! Error types for the Telegram bot.

use thiserror::Error;

/// Errors that can occur in the Telegram bot.
#[derive(Debug, Error)]
pub enum TelegramError {
    /// Configuration could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] notifier_core::ConfigError),

    /// Failed to start the bot.
    #[error("failed to start bot: {0}")]
    BotStartFailed(String),

    /// Another instance holds the PID lock, or the lock file is unusable.
    #[error("instance lock: {0}")]
    Lock(#[from] notifier_persistence::PersistenceError),

    /// Record store failure.
    #[error("store error: {0}")]
    Store(#[from] notifier_store::StoreError),

    /// Completion client could not be built.
    #[error("completion error: {0}")]
    Completion(#[from] notifier_core::CompletionError),

    /// Confirmation workflow failure.
    #[error("{0}")]
    Workflow(#[from] notifier_core::WorkflowError),

    /// Sweep or digest failure.
    #[error("{0}")]
    Engine(#[from] notifier_core::EngineError),

    /// Outbound message failed.
    #[error("{0}")]
    Messenger(#[from] notifier_core::MessengerError),

    /// Photo download failed.
    #[error("download failed: {0}")]
    Download(String),

    /// Telegram API error.
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
}

/// Result type for Telegram operations.
pub type Result<T> = std::result::Result<T, TelegramError>;

impl From<teloxide::DownloadError> for TelegramError {
    fn from(e: teloxide::DownloadError) -> Self {
        TelegramError::Download(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err: TelegramError = notifier_core::ConfigError::Missing(vec!["SUPABASE_URL"]).into();
        assert_eq!(
            err.to_string(),
            "configuration error: missing required environment variables: SUPABASE_URL"
        );
    }

    #[test]
    fn test_download_error_display() {
        let err = TelegramError::Download("file too big".into());
        assert_eq!(err.to_string(), "download failed: file too big");
    }
}

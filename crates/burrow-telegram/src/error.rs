//! Error types for the Telegram bot.

use thiserror::Error;

/// Errors that can occur starting or running the Telegram bot.
#[derive(Debug, Error)]
pub enum BotError {
    /// Bot token not provided.
    #[error("Telegram bot token not set. Set BURROW_BOT_TOKEN environment variable.")]
    NoToken,

    /// Failed to start the bot.
    #[error("failed to start bot: {0}")]
    StartFailed(String),

    /// State store failure.
    #[error("persistence error: {0}")]
    Persistence(#[from] burrow_persistence::PersistenceError),

    /// Platform I/O failure.
    #[error("platform error: {0}")]
    Platform(#[from] burrow_platform::PlatformError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for bot operations.
pub type Result<T> = std::result::Result<T, BotError>;

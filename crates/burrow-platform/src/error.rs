//! Error types for platform I/O.

use thiserror::Error;

use burrow_models::{ChannelId, UserId};

/// Errors raised by platform client calls and waits.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// No channel with the given id is reachable.
    #[error("channel {0} not found")]
    ChannelNotFound(ChannelId),

    /// No user with the given id is reachable.
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// The platform refused the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A send/edit/delete call failed in transit.
    #[error("send failed: {0}")]
    Send(String),

    /// A wait exceeded its duration.
    #[error("the process timed out")]
    Timeout,
}

/// Result type for platform operations.
pub type Result<T> = std::result::Result<T, PlatformError>;

//! Error taxonomy for command execution.

use thiserror::Error;

use burrow_platform::PlatformError;

/// Errors a command invocation can end with.
///
/// `Args` and `Input` are recoverable by the user re-issuing or editing
/// their message; `Auth` is a fixed denial; `Operation` is an underlying
/// action failing for reasons unrelated to user input; `Exit` is a clean
/// early stop; `Internal` is an unanticipated fault that gets reported to
/// the moderator channel.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Invocation is structurally malformed (wrong count/shape of args).
    #[error("{0}")]
    Args(String),

    /// Arguments are well-formed but semantically invalid.
    #[error("{0}")]
    Input(String),

    /// Authorization predicate failed.
    #[error("{reason}")]
    Auth { reason: String },

    /// The handler's underlying action failed.
    #[error("{0}")]
    Operation(String),

    /// The handler stopped early and cleanly; empty text means silence.
    #[error("{0}")]
    Exit(String),

    /// A wait for a reply exceeded its duration.
    #[error("the process timed out")]
    Timeout,

    /// Raw platform I/O failure.
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// Persistent store failure.
    #[error("storage error: {0}")]
    Storage(#[from] burrow_persistence::PersistenceError),

    /// Unanticipated fault; the user sees a generic acknowledgement.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CommandError {
    /// Shorthand constructors used throughout the handlers.
    pub fn args(text: impl Into<String>) -> Self {
        Self::Args(text.into())
    }

    pub fn input(text: impl Into<String>) -> Self {
        Self::Input(text.into())
    }

    pub fn operation(text: impl Into<String>) -> Self {
        Self::Operation(text.into())
    }

    /// The line shown to the invoking user, or `None` for silence.
    pub fn user_text(&self) -> Option<String> {
        match self {
            Self::Args(text) | Self::Input(text) | Self::Operation(text) => Some(text.clone()),
            Self::Auth { reason } => Some(reason.clone()),
            Self::Exit(text) if text.is_empty() => None,
            Self::Exit(text) => Some(text.clone()),
            Self::Timeout | Self::Platform(PlatformError::Timeout) => {
                Some("The process timed out.".to_string())
            }
            Self::Platform(err) => Some(format!("Platform error: {err}")),
            Self::Storage(err) => Some(format!("Storage error: {err}")),
            Self::Internal(_) => {
                Some("Something went wrong running that command; the moderators have been notified.".to_string())
            }
        }
    }

    /// Whether this error should be escalated to the moderator channel.
    pub fn is_fault(&self) -> bool {
        matches!(self, Self::Internal(_))
    }
}

/// Result type for command execution.
pub type Result<T> = std::result::Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_empty_is_silent() {
        assert_eq!(CommandError::Exit(String::new()).user_text(), None);
        assert_eq!(
            CommandError::Exit("Cancelled.".to_string()).user_text(),
            Some("Cancelled.".to_string())
        );
    }

    #[test]
    fn test_platform_timeout_reads_like_timeout() {
        let err = CommandError::Platform(PlatformError::Timeout);
        assert_eq!(err.user_text(), Some("The process timed out.".to_string()));
    }

    #[test]
    fn test_only_internal_is_a_fault() {
        assert!(CommandError::Internal("boom".to_string()).is_fault());
        assert!(!CommandError::args("bad").is_fault());
        assert!(!CommandError::Timeout.is_fault());
    }
}

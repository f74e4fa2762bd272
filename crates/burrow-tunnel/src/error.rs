//! Error types for the tunnel subsystem.

use thiserror::Error;

/// Errors raised by tunnel setup and teardown.
#[derive(Debug, Error)]
pub enum TunnelError {
    /// Fewer than two endpoints could be established; the attempted tunnel
    /// is discarded and never registered.
    #[error("tunnel setup failed: fewer than two endpoints connected")]
    Setup {
        /// Target ids that could not be resolved or reached.
        unreachable: Vec<i64>,
    },

    /// A tunnel must fully tear down its endpoints before leaving the
    /// registry.
    #[error("tunnel is still active")]
    StillActive,
}

/// Result type for tunnel operations.
pub type Result<T> = std::result::Result<T, TunnelError>;

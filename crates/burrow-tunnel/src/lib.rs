//! Channel tunnels for Burrow.
//!
//! A tunnel bridges two or more channels and relays non-command messages
//! between them until it times out from inactivity, is explicitly killed,
//! or disconnections drop it below two endpoints. The [`TunnelManager`]
//! owns every live tunnel; a tunnel leaves the registry only after its
//! endpoints are fully torn down.

pub mod error;
pub mod manager;
pub mod tunnel;

pub use error::{Result, TunnelError};
pub use manager::{TunnelManager, TunnelSummary};
pub use tunnel::Tunnel;

//! Chat-platform client abstraction for Burrow.
//!
//! The core pipeline never talks to a platform SDK directly; it consumes the
//! [`ChatClient`] trait for outbound I/O and the [`Waiters`] registry for
//! "wait for the next qualifying message" suspensions. Adapters (the
//! Telegram crate, the in-memory [`MemoryClient`] used in tests) implement
//! the trait and feed inbound messages into the registry.

pub mod client;
pub mod error;
pub mod memory;
pub mod waiters;

pub use client::ChatClient;
pub use error::{PlatformError, Result};
pub use memory::{MemoryClient, SentRecord};
pub use waiters::Waiters;

//! Core data models for Burrow.
//!
//! This crate provides the fundamental data types used throughout the
//! Burrow system: platform identifiers, inbound messages, outbound
//! payloads, parsed command invocations, and command documentation.

pub mod doc;
pub mod ids;
pub mod invocation;
pub mod message;
pub mod outbound;

// Re-export main types
pub use doc::CommandDoc;
pub use ids::{ChannelId, MessageId, TunnelId, UserId};
pub use invocation::{FlagValue, Invocation};
pub use message::{Channel, ChannelKind, Message, User};
pub use outbound::{Embed, EmbedField, MessageRef, SendPayload};

//! Command routing and response rendering for Burrow.
//!
//! This crate turns a raw text line into a parsed invocation, resolves it
//! against an ordered set of command providers with different authorization
//! rules, executes the handler, and streams whatever it produced back to the
//! origin channel as one or more platform messages.
//!
//! Data flow: inbound line → [`token::tokenize`] → [`flags::parse_flags`] →
//! [`Router::find_command`] → provider authentication → handler invocation →
//! [`Renderer`] drain → outbound sends.

pub mod context;
pub mod error;
pub mod flags;
pub mod pipeline;
pub mod provider;
pub mod render;
pub mod respond;
pub mod router;
pub mod token;

pub use context::Context;
pub use error::{CommandError, Result};
pub use pipeline::CommandPipeline;
pub use provider::{
    AuthDecision, AuthRule, CommandProvider, CommandSet, CustomProvider, Handler,
};
pub use render::Renderer;
pub use respond::{Response, ResponseItem};
pub use router::Router;

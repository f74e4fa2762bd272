//! Persistence layer for Burrow.
//!
//! This crate provides crash-safe persistence for bot state using atomic
//! file operations (write to temp file, then rename). Four stores share the
//! same state directory:
//!
//! - [`MemberStore`]: per-user attribute documents with dotted-path patches
//! - [`AliasStore`]: alternate invocation words for real commands
//! - [`CommandStore`]: runtime-defined custom reply commands
//! - [`ConfigStore`]: the bot configuration document
//!
//! # Example
//!
//! ```no_run
//! use burrow_persistence::MemberStore;
//! use burrow_models::UserId;
//!
//! let store = MemberStore::open("/home/user/.burrow").unwrap();
//! store.set_attribute(UserId(42), "profile.level", 3.into()).unwrap();
//! let level = store.get_attribute(UserId(42), "profile.level");
//! assert_eq!(level, Some(3.into()));
//! ```

pub mod alias_store;
pub mod atomic;
pub mod command_store;
pub mod config_store;
pub mod error;
pub mod member_store;

pub use alias_store::AliasStore;
pub use command_store::{CommandStore, CustomCommand};
pub use config_store::{BotConfig, ConfigStore};
pub use error::{PersistenceError, Result};
pub use member_store::MemberStore;

//! Telegram interface for Burrow.
//!
//! This crate binds the platform-agnostic command pipeline and tunnel
//! subsystem to Telegram: a teloxide-backed [`burrow_platform::ChatClient`],
//! the update dispatcher that feeds inbound messages to waiters and the
//! router, and the built-in command set.
//!
//! # Environment Variables
//!
//! Required:
//! - `BURROW_BOT_TOKEN`: Bot token from @BotFather
//!
//! # Example
//!
//! ```no_run
//! use burrow_telegram::BurrowBot;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bot = BurrowBot::new(Path::new("/path/to/state"))?;
//!     bot.start_polling().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod client;
pub mod commands;
pub mod error;

pub use bot::BurrowBot;
pub use client::TelegramClient;
pub use error::{BotError, Result};

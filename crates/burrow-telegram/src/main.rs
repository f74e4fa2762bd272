//! Burrow Telegram bot binary.
//!
//! Start the bot with:
//! ```bash
//! BURROW_BOT_TOKEN=xxx cargo run -p burrow-telegram
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use burrow_telegram::BurrowBot;

/// Burrow - moderation and channel tunnels for Telegram
#[derive(Parser, Debug)]
#[command(name = "burrow-telegram")]
#[command(about = "Telegram bot with command routing and channel tunnels")]
struct Args {
    /// State directory (default: ~/.burrow)
    #[arg(short, long)]
    state_dir: Option<PathBuf>,

    /// Decorate every outbound message with a devmode marker
    #[arg(long)]
    dev: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let _ = dotenvy::dotenv();

    let filter = match args.verbose {
        0 => "info,teloxide=warn,hyper=warn",
        1 => "debug,teloxide=info,hyper=info",
        2 => "trace,teloxide=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let state_dir = args
        .state_dir
        .or_else(|| dirs::home_dir().map(|home| home.join(".burrow")))
        .ok_or("could not determine a state directory")?;
    std::fs::create_dir_all(&state_dir)?;

    let mut bot = BurrowBot::new(&state_dir)?;
    if args.dev {
        bot = bot.with_devmode();
    }

    match bot.get_me().await {
        Ok(username) => {
            tracing::info!(username = %username, "Bot initialized");
            println!("Burrow is up as @{username}. Press Ctrl+C to stop.");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to reach Telegram");
            return Err(e.into());
        }
    }

    bot.start_polling().await?;
    Ok(())
}

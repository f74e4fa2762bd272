//! Main Telegram bot implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use burrow_core::{CommandPipeline, Context, Router};
use burrow_models::{ChannelId, MessageId, MessageRef, UserId};
use burrow_persistence::{AliasStore, CommandStore, ConfigStore, MemberStore};
use burrow_platform::{ChatClient, Waiters};
use burrow_tunnel::TunnelManager;

use crate::client::TelegramClient;
use crate::commands::{build_providers, CommandDeps};
use crate::error::{BotError, Result};

/// The Burrow Telegram bot.
pub struct BurrowBot {
    bot: Bot,
    state_dir: PathBuf,
    devmode: bool,
}

/// Per-process dispatch state shared across update handlers.
struct DispatchState {
    pipeline: CommandPipeline,
    waiters: Arc<Waiters>,
    members: Arc<MemberStore>,
    bot_user: UserId,
    /// Invoking message → the single reply it produced, for edited-message
    /// re-rendering.
    replies: Mutex<HashMap<(ChannelId, MessageId), MessageRef>>,
}

impl DispatchState {
    /// The generic message hook: feed waiters (tunnels relay through
    /// them), then the command pipeline.
    async fn on_message(&self, message: &teloxide::types::Message, edited: bool) {
        let Some(mut message) = TelegramClient::convert_message(message) else {
            return;
        };
        if message.author.id == self.bot_user {
            return;
        }
        message.author.roles = self.members.roles(message.author.id);

        // Waiters see every message; tunnel relays and interactive prompts
        // hang off this.
        self.waiters.deliver(&message);

        let key = (message.channel.id, message.id);
        let edit_target = if edited {
            self.replies.lock().unwrap().get(&key).copied()
        } else {
            None
        };

        if let Some(refs) = self.pipeline.handle_message(&message, edit_target).await {
            debug!(
                channel = %message.channel.id,
                replies = refs.len(),
                edited,
                "command handled"
            );
            let mut replies = self.replies.lock().unwrap();
            // Only a single reply can be edited in place later.
            if refs.len() == 1 {
                replies.insert(key, refs[0]);
            } else {
                replies.remove(&key);
            }
        }
    }
}

impl BurrowBot {
    /// Create a new bot instance.
    ///
    /// Requires `BURROW_BOT_TOKEN` to be set.
    pub fn new(state_dir: &Path) -> Result<Self> {
        let token = std::env::var("BURROW_BOT_TOKEN").map_err(|_| BotError::NoToken)?;
        Ok(Self {
            bot: Bot::new(token),
            state_dir: state_dir.to_path_buf(),
            devmode: false,
        })
    }

    /// Force devmode decoration on, regardless of the stored config.
    pub fn with_devmode(mut self) -> Self {
        self.devmode = true;
        self
    }

    /// Get the bot's username.
    pub async fn get_me(&self) -> Result<String> {
        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| BotError::StartFailed(e.to_string()))?;
        Ok(me.username().to_string())
    }

    /// Start the bot in long-polling mode. Returns when the process is
    /// shut down.
    pub async fn start_polling(&self) -> Result<()> {
        info!("Starting Burrow in polling mode...");

        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| BotError::StartFailed(e.to_string()))?;
        let bot_user = UserId(me.id.0 as i64);

        // Stores
        let members = Arc::new(MemberStore::open(&self.state_dir)?);
        let aliases = Arc::new(AliasStore::open(&self.state_dir)?);
        let customs = Arc::new(CommandStore::open(&self.state_dir)?);
        let config = Arc::new(ConfigStore::open(&self.state_dir)?);
        if self.devmode {
            config.set(|c| c.devmode = true)?;
        }

        // Platform plumbing
        let client: Arc<dyn ChatClient> =
            Arc::new(TelegramClient::new(self.bot.clone(), bot_user));
        let waiters = Arc::new(Waiters::new());
        let manager = Arc::new(TunnelManager::new(
            Arc::clone(&client),
            Arc::clone(&waiters),
        ));

        let ctx = Context::new(
            Arc::clone(&client),
            Arc::clone(&waiters),
            Arc::clone(&members),
            Arc::clone(&aliases),
            Arc::clone(&customs),
            Arc::clone(&config),
        );

        // Providers, then the router, then the late-bound slot help and
        // alias editing read it through.
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let router_slot = Arc::new(OnceLock::new());
        let deps = CommandDeps {
            manager: Arc::clone(&manager),
            router: Arc::clone(&router_slot),
            shutdown: shutdown_tx,
        };
        let providers = build_providers(&deps, &ctx);
        let router = Arc::new(Router::new(providers, Arc::clone(&aliases)));
        let _ = router_slot.set(Arc::clone(&router));

        let decorator_config = Arc::clone(&config);
        let pipeline = CommandPipeline::new(router, ctx).with_decorator(Arc::new(
            move |text: &str| {
                if decorator_config.get().devmode {
                    format!("[dev] {text}")
                } else {
                    text.to_string()
                }
            },
        ));

        let state = Arc::new(DispatchState {
            pipeline,
            waiters,
            members,
            bot_user,
            replies: Mutex::new(HashMap::new()),
        });

        let state_for_messages = Arc::clone(&state);
        let state_for_edits = Arc::clone(&state);

        let handler = dptree::entry()
            .branch(Update::filter_message().endpoint(
                move |_bot: Bot, msg: teloxide::types::Message| {
                    let state = Arc::clone(&state_for_messages);
                    async move {
                        state.on_message(&msg, false).await;
                        respond(())
                    }
                },
            ))
            .branch(Update::filter_edited_message().endpoint(
                move |_bot: Bot, msg: teloxide::types::Message| {
                    let state = Arc::clone(&state_for_edits);
                    async move {
                        state.on_message(&msg, true).await;
                        respond(())
                    }
                },
            ));

        info!(username = %me.username(), "Bot is running");

        let mut dispatcher = Dispatcher::builder(self.bot.clone(), handler)
            .default_handler(|upd| async move {
                debug!("unhandled update: {:?}", upd);
            })
            .enable_ctrlc_handler()
            .build();

        // The owner's shutdown command stops the dispatcher.
        let token = dispatcher.shutdown_token();
        tokio::spawn(async move {
            if shutdown_rx.recv().await.is_some() {
                warn!("shutdown requested by owner command");
                let _ = token.shutdown();
            }
        });

        dispatcher.dispatch().await;
        Ok(())
    }
}

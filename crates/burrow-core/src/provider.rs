//! Command providers: groups of handlers sharing one authorization rule.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use tracing::warn;

use burrow_models::{CommandDoc, Invocation, Message};
use burrow_persistence::{CommandStore, ConfigStore};

use crate::context::Context;
use crate::error::Result;
use crate::respond::Response;

type HandlerFn = Arc<dyn Fn(Invocation, Context) -> BoxFuture<'static, Result<Response>> + Send + Sync>;

/// A named async-capable command function.
#[derive(Clone)]
pub struct Handler {
    name: String,
    doc: CommandDoc,
    func: HandlerFn,
}

impl Handler {
    /// Build a handler from an async closure. `doc_text` follows the
    /// blank-line section format of [`CommandDoc`].
    pub fn new<F, Fut>(name: impl Into<String>, doc_text: &str, func: F) -> Self
    where
        F: Fn(Invocation, Context) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Response>> + Send + 'static,
    {
        Self {
            name: name.into(),
            doc: CommandDoc::parse(doc_text),
            func: Arc::new(move |invocation, ctx| Box::pin(func(invocation, ctx))),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn doc(&self) -> &CommandDoc {
        &self.doc
    }

    pub async fn invoke(&self, invocation: Invocation, ctx: Context) -> Result<Response> {
        (self.func)(invocation, ctx).await
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}

/// Outcome of a provider's authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    Allow,
    /// Denied, with the specific unmet requirement.
    Deny(String),
}

/// The authorization rule a provider applies to every one of its handlers.
#[derive(Debug, Clone)]
pub enum AuthRule {
    /// Anyone may invoke.
    Public,
    /// The author must carry a named platform role.
    Role(String),
    /// The author's operator level must be at least this.
    Level(u8),
    /// The author must belong to a named id whitelist.
    Whitelist(String),
    /// Only the configured owner.
    Sudo,
}

impl AuthRule {
    /// Apply the rule to a message author.
    pub fn check(&self, message: &Message, ctx: &Context) -> AuthDecision {
        match self {
            AuthRule::Public => AuthDecision::Allow,
            AuthRule::Role(role) => {
                if message.author.has_role(role) {
                    AuthDecision::Allow
                } else {
                    AuthDecision::Deny(format!("This command requires the `{role}` role."))
                }
            }
            AuthRule::Level(required) => {
                let level = ctx.members.operator_level(message.author.id);
                if level >= *required {
                    AuthDecision::Allow
                } else {
                    AuthDecision::Deny(format!(
                        "This command requires operator level {required}."
                    ))
                }
            }
            AuthRule::Whitelist(name) => {
                if ctx.members.in_whitelist(name, message.author.id) {
                    AuthDecision::Allow
                } else {
                    AuthDecision::Deny(format!(
                        "This command requires membership in the `{name}` whitelist."
                    ))
                }
            }
            AuthRule::Sudo => {
                if ctx.config.get().owner == Some(message.author.id) {
                    AuthDecision::Allow
                } else {
                    AuthDecision::Deny("This command is reserved for the bot owner.".to_string())
                }
            }
        }
    }
}

/// A source of handlers plus the rule gating them.
///
/// Providers are registered once at startup in a fixed order; that order is
/// the tie-break precedence for name resolution.
#[async_trait]
pub trait CommandProvider: Send + Sync {
    /// Display name, used by help listings.
    fn name(&self) -> &str;

    /// Look up a handler by exact, case-sensitive keyword.
    fn get_handler(&self, word: &str) -> Option<Handler>;

    /// All invocation words this provider currently exposes, sorted.
    fn command_words(&self) -> Vec<String>;

    /// Whether the author may invoke this provider's handlers.
    async fn authenticate(&self, message: &Message, ctx: &Context) -> AuthDecision;
}

/// A fixed set of built-in handlers behind one [`AuthRule`].
pub struct CommandSet {
    name: String,
    rule: AuthRule,
    handlers: HashMap<String, Handler>,
}

impl CommandSet {
    pub fn new(name: impl Into<String>, rule: AuthRule) -> Self {
        Self {
            name: name.into(),
            rule,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. Keywords are unique per provider; a duplicate
    /// keeps the first registration and logs.
    pub fn register(mut self, handler: Handler) -> Self {
        if self.handlers.contains_key(handler.name()) {
            warn!(provider = %self.name, command = %handler.name(), "duplicate handler ignored");
            return self;
        }
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }
}

#[async_trait]
impl CommandProvider for CommandSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn get_handler(&self, word: &str) -> Option<Handler> {
        self.handlers.get(word).cloned()
    }

    fn command_words(&self) -> Vec<String> {
        let mut words: Vec<_> = self.handlers.keys().cloned().collect();
        words.sort();
        words
    }

    async fn authenticate(&self, message: &Message, ctx: &Context) -> AuthDecision {
        self.rule.check(message, ctx)
    }
}

/// Runtime-defined custom commands, sourced from the command store at every
/// lookup so newly defined commands are live immediately.
pub struct CustomProvider {
    customs: Arc<CommandStore>,
    config: Arc<ConfigStore>,
}

impl CustomProvider {
    pub fn new(customs: Arc<CommandStore>, config: Arc<ConfigStore>) -> Self {
        Self { customs, config }
    }
}

#[async_trait]
impl CommandProvider for CustomProvider {
    fn name(&self) -> &str {
        "custom"
    }

    fn get_handler(&self, word: &str) -> Option<Handler> {
        let custom = self.customs.get(word)?;
        let config = Arc::clone(&self.config);
        Some(Handler::new(
            word,
            "Custom command.",
            move |invocation: Invocation, _ctx: Context| {
                let custom = custom.clone();
                let config = config.clone();
                async move {
                    // Gated commands outside a permitted channel answer with
                    // nothing at all, indistinguishable from an unknown
                    // command.
                    if custom.nsfw
                        && !config
                            .get()
                            .nsfw_channels
                            .contains(&invocation.source.channel.id)
                    {
                        return Ok(Response::none());
                    }
                    Ok(Response::text(custom.reply))
                }
            },
        ))
    }

    fn command_words(&self) -> Vec<String> {
        self.customs.words()
    }

    async fn authenticate(&self, _message: &Message, _ctx: &Context) -> AuthDecision {
        AuthDecision::Allow
    }
}

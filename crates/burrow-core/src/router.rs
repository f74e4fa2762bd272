//! Command resolution and dispatch.

use std::sync::Arc;

use tracing::debug;

use burrow_models::{Invocation, Message};
use burrow_persistence::AliasStore;

use crate::context::Context;
use crate::error::{CommandError, Result};
use crate::flags::parse_flags;
use crate::provider::{AuthDecision, CommandProvider, Handler};
use crate::respond::Response;
use crate::token::tokenize;

/// Resolves command words against an ordered list of providers and invokes
/// the matching handler.
///
/// Provider order is fixed at construction and is the tie-break precedence:
/// built-in providers registered ahead of the custom provider always shadow
/// same-named custom commands, and the check runs on every lookup rather
/// than caching a resolution.
pub struct Router {
    providers: Vec<Arc<dyn CommandProvider>>,
    aliases: Arc<AliasStore>,
}

impl Router {
    pub fn new(providers: Vec<Arc<dyn CommandProvider>>, aliases: Arc<AliasStore>) -> Self {
        Self { providers, aliases }
    }

    /// The registered providers, in precedence order.
    pub fn providers(&self) -> &[Arc<dyn CommandProvider>] {
        &self.providers
    }

    /// Whether a word resolves directly to a handler (aliases not
    /// consulted). The alias-editing command uses this to refuse aliases
    /// that would shadow a real command.
    pub fn is_command(&self, word: &str) -> bool {
        self.providers.iter().any(|p| p.get_handler(word).is_some())
    }

    /// Find the first provider exposing a handler for `word`.
    ///
    /// Alias resolution is attempted only when no provider matches the word
    /// directly, so an alias can never shadow a real command.
    pub fn find_command(&self, word: &str) -> Option<(Arc<dyn CommandProvider>, Handler)> {
        for provider in &self.providers {
            if let Some(handler) = provider.get_handler(word) {
                return Some((Arc::clone(provider), handler));
            }
        }
        let target = self.aliases.resolve(word)?;
        for provider in &self.providers {
            if let Some(handler) = provider.get_handler(&target) {
                return Some((Arc::clone(provider), handler));
            }
        }
        None
    }

    /// Route one command line (prefix already stripped) to its handler.
    ///
    /// Authentication failures surface as [`CommandError::Auth`]; an
    /// unknown word synthesizes a "command not found" response instead of
    /// erroring.
    pub async fn route(&self, message: &Message, line: &str, ctx: &Context) -> Result<Response> {
        let (_, short_form) = tokenize(line);
        if short_form.is_empty() {
            return Ok(Response::none());
        }

        let (word, rest) = match short_form.split_once(char::is_whitespace) {
            Some((word, rest)) => (word.to_string(), rest.trim().to_string()),
            None => (short_form.clone(), String::new()),
        };

        let Some((provider, handler)) = self.find_command(&word) else {
            return Ok(Response::text(format!("Unknown command: `{word}`")));
        };

        // The owner bypasses every provider's rule.
        let is_owner = ctx.config.get().owner == Some(message.author.id);
        if !is_owner {
            if let AuthDecision::Deny(reason) = provider.authenticate(message, ctx).await {
                return Err(CommandError::Auth { reason });
            }
        }

        let (tokens, _) = tokenize(&rest);
        let (args, flags) = parse_flags(tokens);

        debug!(
            command = %handler.name(),
            provider = %provider.name(),
            user = %message.author.id,
            channel = %message.channel.id,
            "dispatching command"
        );

        let invocation = Invocation {
            raw_text: message.text.clone(),
            command_word: word,
            rest,
            args,
            flags,
            source: message.clone(),
        };
        handler.invoke(invocation, ctx.clone()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{AuthRule, CommandSet};
    use crate::respond::ResponseItem;
    use burrow_models::{Channel, ChannelId, MessageId, User, UserId};
    use burrow_persistence::{CommandStore, ConfigStore, MemberStore};
    use burrow_platform::{MemoryClient, Waiters};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_context() -> (Context, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            Arc::new(MemoryClient::new(UserId(999))),
            Arc::new(Waiters::new()),
            Arc::new(MemberStore::open(dir.path()).unwrap()),
            Arc::new(AliasStore::open(dir.path()).unwrap()),
            Arc::new(CommandStore::open(dir.path()).unwrap()),
            Arc::new(ConfigStore::open(dir.path()).unwrap()),
        );
        (ctx, dir)
    }

    fn message(text: &str, author: User) -> Message {
        Message::new(
            MessageId(1),
            Channel::group(ChannelId(5), "general"),
            author,
            text,
        )
    }

    fn echo_set(name: &str, rule: AuthRule, word: &str, reply: &str) -> Arc<CommandSet> {
        let reply = reply.to_string();
        Arc::new(CommandSet::new(name, rule).register(Handler::new(
            word,
            "Echo.",
            move |_inv, _ctx| {
                let reply = reply.clone();
                async move { Ok(Response::text(reply)) }
            },
        )))
    }

    #[tokio::test]
    async fn test_first_provider_wins() {
        let (ctx, _dir) = test_context();
        let router = Router::new(
            vec![
                echo_set("first", AuthRule::Public, "ping", "from-first"),
                echo_set("second", AuthRule::Public, "ping", "from-second"),
            ],
            Arc::clone(&ctx.aliases),
        );

        let response = router
            .route(&message("ping", User::new(UserId(1), "a")), "ping", &ctx)
            .await
            .unwrap();
        match response {
            Response::Item(ResponseItem::Text(text)) => assert_eq!(text, "from-first"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_builtin_shadows_alias() {
        let (ctx, _dir) = test_context();
        ctx.aliases.set("ban", "ping").unwrap();

        let router = Router::new(
            vec![
                echo_set("mod", AuthRule::Public, "ban", "real-ban"),
                echo_set("general", AuthRule::Public, "ping", "pong"),
            ],
            Arc::clone(&ctx.aliases),
        );

        // The alias points elsewhere, but the built-in always wins.
        let (_, handler) = router.find_command("ban").unwrap();
        assert_eq!(handler.name(), "ban");
    }

    #[tokio::test]
    async fn test_alias_resolves_on_direct_miss() {
        let (ctx, _dir) = test_context();
        ctx.aliases.set("p", "ping").unwrap();

        let router = Router::new(
            vec![echo_set("general", AuthRule::Public, "ping", "pong")],
            Arc::clone(&ctx.aliases),
        );

        let (_, handler) = router.find_command("p").unwrap();
        assert_eq!(handler.name(), "ping");
        assert!(router.find_command("q").is_none());
    }

    #[tokio::test]
    async fn test_matching_is_case_sensitive() {
        let (ctx, _dir) = test_context();
        let router = Router::new(
            vec![echo_set("general", AuthRule::Public, "ping", "pong")],
            Arc::clone(&ctx.aliases),
        );
        assert!(router.find_command("ping").is_some());
        assert!(router.find_command("Ping").is_none());
    }

    #[tokio::test]
    async fn test_denied_handler_never_runs() {
        let (ctx, _dir) = test_context();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let set = Arc::new(
            CommandSet::new("mod", AuthRule::Role("moderator".to_string())).register(
                Handler::new("ban", "Ban.", move |_inv, _ctx| {
                    let counter = Arc::clone(&counter);
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(Response::text("banned"))
                    }
                }),
            ),
        );
        let router = Router::new(vec![set], Arc::clone(&ctx.aliases));

        let result = router
            .route(
                &message("ban 123", User::new(UserId(1), "pleb")),
                "ban 123 --reason=test --noconfirm",
                &ctx,
            )
            .await;

        match result {
            Err(CommandError::Auth { reason }) => {
                assert_eq!(reason, "This command requires the `moderator` role.");
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_owner_bypasses_auth() {
        let (ctx, _dir) = test_context();
        ctx.config.set(|c| c.owner = Some(UserId(42))).unwrap();

        let router = Router::new(
            vec![echo_set(
                "mod",
                AuthRule::Role("moderator".to_string()),
                "ban",
                "banned",
            )],
            Arc::clone(&ctx.aliases),
        );

        let response = router
            .route(&message("ban", User::new(UserId(42), "owner")), "ban", &ctx)
            .await;
        assert!(response.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_word_synthesizes_reply() {
        let (ctx, _dir) = test_context();
        let router = Router::new(vec![], Arc::clone(&ctx.aliases));

        let response = router
            .route(&message("zap", User::new(UserId(1), "a")), "zap", &ctx)
            .await
            .unwrap();
        match response {
            Response::Item(ResponseItem::Text(text)) => {
                assert_eq!(text, "Unknown command: `zap`");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_handler_receives_parsed_args_and_rest() {
        let (ctx, _dir) = test_context();
        let set = Arc::new(CommandSet::new("general", AuthRule::Public).register(
            Handler::new("echo", "Echo.", |inv: Invocation, _ctx| async move {
                assert_eq!(inv.args, vec!["a", "b"]);
                assert_eq!(inv.flag_value("loud"), Some("yes"));
                assert_eq!(inv.rest, "a b --loud yes");
                Ok(Response::text(inv.rest))
            }),
        ));
        let router = Router::new(vec![set], Arc::clone(&ctx.aliases));

        let result = router
            .route(
                &message("echo a b --loud yes", User::new(UserId(1), "a")),
                "echo a b --loud yes ; trailing comment",
                &ctx,
            )
            .await;
        assert!(result.is_ok());
    }
}

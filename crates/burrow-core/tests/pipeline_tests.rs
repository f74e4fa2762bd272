//! End-to-end tests of the command pipeline over the in-memory client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use burrow_core::{
    AuthRule, CommandError, CommandPipeline, CommandSet, Context, CustomProvider, Handler,
    Response, ResponseItem, Router,
};
use burrow_models::{Channel, ChannelId, Message, MessageId, User, UserId};
use burrow_persistence::{AliasStore, CommandStore, ConfigStore, CustomCommand, MemberStore};
use burrow_platform::{MemoryClient, Waiters};
use tempfile::TempDir;

struct Fixture {
    client: Arc<MemoryClient>,
    ctx: Context,
    _dir: TempDir,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let client = Arc::new(MemoryClient::new(UserId(999)));
    client.add_channel(Channel::group(ChannelId(1), "general"));
    client.add_channel(Channel::group(ChannelId(50), "mod-log"));
    let ctx = Context::new(
        client.clone(),
        Arc::new(Waiters::new()),
        Arc::new(MemberStore::open(dir.path()).unwrap()),
        Arc::new(AliasStore::open(dir.path()).unwrap()),
        Arc::new(CommandStore::open(dir.path()).unwrap()),
        Arc::new(ConfigStore::open(dir.path()).unwrap()),
    );
    Fixture {
        client,
        ctx,
        _dir: dir,
    }
}

fn inbound(text: &str, author: User) -> Message {
    Message::new(
        MessageId(1),
        Channel::group(ChannelId(1), "general"),
        author,
        text,
    )
}

#[tokio::test]
async fn denied_invocation_sends_exactly_one_denial_and_no_side_effects() {
    let fx = fixture();
    let ban_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&ban_calls);

    let moderation = Arc::new(
        CommandSet::new("moderation", AuthRule::Role("moderator".to_string())).register(
            Handler::new("ban", "Ban a member.", move |_inv, _ctx| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Response::text("banned"))
                }
            }),
        ),
    );
    let router = Arc::new(Router::new(vec![moderation], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    let message = inbound("!ban 123 --reason=test --noconfirm", User::new(UserId(7), "pleb"));
    assert!(pipeline.handle_message(&message, None).await.is_some());

    assert_eq!(
        fx.client.texts_to(ChannelId(1)),
        vec!["This command requires the `moderator` role."]
    );
    assert_eq!(ban_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn non_prefixed_messages_are_ignored() {
    let fx = fixture();
    let router = Arc::new(Router::new(vec![], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    let message = inbound("just chatting", User::new(UserId(7), "pleb"));
    assert!(pipeline.handle_message(&message, None).await.is_none());
    assert!(fx.client.sent().is_empty());
}

#[tokio::test]
async fn echo_round_trip_with_flags_and_comment() {
    let fx = fixture();
    let general = Arc::new(CommandSet::new("general", AuthRule::Public).register(
        Handler::new("echo", "Echo the rest of the line.", |inv: burrow_models::Invocation, _ctx| async move {
            let mut line = inv.args.join(" ");
            if inv.flag_set("shout") {
                line = line.to_uppercase();
            }
            Ok(Response::text(line))
        }),
    ));
    let router = Arc::new(Router::new(vec![general], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    let message = inbound("!echo hello there --shout ; ignored", User::new(UserId(7), "pleb"));
    pipeline.handle_message(&message, None).await;

    assert_eq!(fx.client.texts_to(ChannelId(1)), vec!["HELLO THERE"]);
}

#[tokio::test]
async fn builtin_shadows_custom_command_created_later() {
    let fx = fixture();
    let general = Arc::new(CommandSet::new("general", AuthRule::Public).register(
        Handler::new("ping", "Pong.", |_inv, _ctx| async { Ok(Response::text("pong")) }),
    ));
    let custom = Arc::new(CustomProvider::new(
        Arc::clone(&fx.ctx.customs),
        Arc::clone(&fx.ctx.config),
    ));
    let router = Arc::new(Router::new(
        vec![general, custom],
        Arc::clone(&fx.ctx.aliases),
    ));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    // Defined after startup, same word as the built-in.
    fx.ctx
        .customs
        .define(
            "ping",
            CustomCommand {
                reply: "shadowed".to_string(),
                nsfw: false,
                created_by: UserId(1),
                created_at: chrono::Utc::now(),
            },
        )
        .unwrap();

    let message = inbound("!ping", User::new(UserId(7), "pleb"));
    pipeline.handle_message(&message, None).await;

    assert_eq!(fx.client.texts_to(ChannelId(1)), vec!["pong"]);
}

#[tokio::test]
async fn nsfw_custom_command_is_silent_outside_allowed_channels() {
    let fx = fixture();
    let custom = Arc::new(CustomProvider::new(
        Arc::clone(&fx.ctx.customs),
        Arc::clone(&fx.ctx.config),
    ));
    let router = Arc::new(Router::new(vec![custom], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    fx.ctx
        .customs
        .define(
            "lewd",
            CustomCommand {
                reply: "oh my".to_string(),
                nsfw: true,
                created_by: UserId(1),
                created_at: chrono::Utc::now(),
            },
        )
        .unwrap();

    let message = inbound("!lewd", User::new(UserId(7), "pleb"));
    assert!(pipeline.handle_message(&message, None).await.is_some());
    assert!(fx.client.sent().is_empty());

    // Permitted channel: answers normally.
    fx.ctx
        .config
        .set(|c| c.nsfw_channels.push(ChannelId(1)))
        .unwrap();
    pipeline.handle_message(&message, None).await;
    assert_eq!(fx.client.texts_to(ChannelId(1)), vec!["oh my"]);
}

#[tokio::test]
async fn streamed_response_is_delivered_in_production_order() {
    let fx = fixture();
    let general = Arc::new(CommandSet::new("general", AuthRule::Public).register(
        Handler::new("steps", "Run steps.", |_inv, _ctx| async {
            Ok(Response::stream(futures::stream::iter(vec![
                Ok(ResponseItem::Text("step 1".to_string())),
                Ok(ResponseItem::Flush),
                Ok(ResponseItem::Text("step 2".to_string())),
                Ok(ResponseItem::Flush),
            ])))
        }),
    ));
    let router = Arc::new(Router::new(vec![general], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    pipeline
        .handle_message(&inbound("!steps", User::new(UserId(7), "pleb")), None)
        .await;

    assert_eq!(fx.client.texts_to(ChannelId(1)), vec!["step 1", "step 2"]);
}

#[tokio::test]
async fn internal_fault_reports_to_moderator_channel() {
    let fx = fixture();
    fx.ctx
        .config
        .set(|c| c.report_channel = Some(ChannelId(50)))
        .unwrap();

    let general = Arc::new(CommandSet::new("general", AuthRule::Public).register(
        Handler::new("crashy", "Always fails.", |_inv, _ctx| async {
            Err(CommandError::Internal("index out of range".to_string()))
        }),
    ));
    let router = Arc::new(Router::new(vec![general], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    pipeline
        .handle_message(&inbound("!crashy", User::new(UserId(7), "pleb")), None)
        .await;

    // Generic acknowledgement to the user, never a raw trace.
    let user_replies = fx.client.texts_to(ChannelId(1));
    assert_eq!(user_replies.len(), 1);
    assert!(user_replies[0].contains("moderators have been notified"));

    // Context-rich embed in the moderator channel.
    let reports = fx.client.sent_to(ChannelId(50));
    assert_eq!(reports.len(), 1);
    let embed = reports[0].embed.as_ref().unwrap();
    assert_eq!(embed.title.as_deref(), Some("Unhandled command error"));
    assert!(embed.fields.iter().any(|f| f.value.contains("pleb")));
}

#[tokio::test]
async fn edited_invocation_edits_the_prior_reply_in_place() {
    let fx = fixture();
    let general = Arc::new(CommandSet::new("general", AuthRule::Public).register(
        Handler::new("echo", "Echo.", |inv: burrow_models::Invocation, _ctx| async move {
            Ok(Response::text(inv.rest))
        }),
    ));
    let router = Arc::new(Router::new(vec![general], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone());

    let first = inbound("!echo first", User::new(UserId(7), "pleb"));
    pipeline.handle_message(&first, None).await;
    let prior = fx.client.sent()[0].reference;

    let edited = inbound("!echo second", User::new(UserId(7), "pleb"));
    pipeline.handle_message(&edited, Some(prior)).await;

    let edits = fx.client.edits();
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].0, prior);
    assert_eq!(edits[0].1.content.as_deref(), Some("second"));
    // No second fresh send.
    assert_eq!(fx.client.sent().len(), 1);
}

#[tokio::test]
async fn devmode_decoration_applies_to_replies() {
    let fx = fixture();
    let general = Arc::new(CommandSet::new("general", AuthRule::Public).register(
        Handler::new("ping", "Pong.", |_inv, _ctx| async { Ok(Response::text("pong")) }),
    ));
    let router = Arc::new(Router::new(vec![general], Arc::clone(&fx.ctx.aliases)));
    let pipeline = CommandPipeline::new(router, fx.ctx.clone())
        .with_decorator(Arc::new(|text: &str| format!("[dev] {text}")));

    pipeline
        .handle_message(&inbound("!ping", User::new(UserId(7), "pleb")), None)
        .await;

    assert_eq!(fx.client.texts_to(ChannelId(1)), vec!["[dev] pong"]);
}

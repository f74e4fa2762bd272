//! Built-in command set for the Burrow bot.
//!
//! Every handler here is a thin wrapper: parse the invocation, call into
//! the platform client or a store, and hand back a response for the
//! renderer to deliver.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use rand::Rng;
use tokio::sync::mpsc;

use burrow_core::{
    AuthRule, CommandError, CommandProvider, CommandSet, Context, CustomProvider, Handler,
    Response, ResponseItem, Router,
};
use burrow_models::{ChannelId, Embed, Invocation, UserId};
use burrow_persistence::CustomCommand;
use burrow_tunnel::{TunnelError, TunnelManager};

/// The router is constructed after the providers (help introspects it), so
/// handlers reach it through a late-bound slot.
pub type RouterSlot = Arc<OnceLock<Arc<Router>>>;

/// Shared dependencies the built-in handlers close over.
pub struct CommandDeps {
    pub manager: Arc<TunnelManager>,
    pub router: RouterSlot,
    pub shutdown: mpsc::Sender<()>,
}

/// Build the provider list in precedence order: built-ins first, custom
/// commands last so they can never shadow a built-in.
pub fn build_providers(deps: &CommandDeps, ctx: &Context) -> Vec<Arc<dyn CommandProvider>> {
    vec![
        Arc::new(general_commands(deps)),
        Arc::new(moderation_commands()),
        Arc::new(operator_commands(deps)),
        Arc::new(owner_commands(deps)),
        Arc::new(CustomProvider::new(
            Arc::clone(&ctx.customs),
            Arc::clone(&ctx.config),
        )),
    ]
}

fn parse_i64(value: &str, what: &str) -> Result<i64, CommandError> {
    value
        .parse()
        .map_err(|_| CommandError::input(format!("`{value}` is not a valid {what}.")))
}

fn router_from(slot: &RouterSlot) -> Result<Arc<Router>, CommandError> {
    slot.get()
        .cloned()
        .ok_or_else(|| CommandError::Internal("router not initialized".to_string()))
}

fn general_commands(deps: &CommandDeps) -> CommandSet {
    let router = Arc::clone(&deps.router);

    CommandSet::new("general", AuthRule::Public)
        .register(Handler::new(
            "help",
            "Show available commands, or detailed help for one command.\n\n\
             Syntax: help [command]",
            move |inv: Invocation, _ctx: Context| {
                let router = Arc::clone(&router);
                async move { help(&router, &inv) }
            },
        ))
        .register(Handler::new(
            "ping",
            "Check that the bot is alive.",
            |_inv, _ctx| async { Ok(Response::text("Pong!")) },
        ))
        .register(Handler::new(
            "echo",
            "Repeat the rest of the line verbatim.\n\nSyntax: echo <text>",
            |inv: Invocation, _ctx| async move {
                if inv.rest.is_empty() {
                    return Err(CommandError::args("Nothing to echo. Syntax: echo <text>"));
                }
                Ok(Response::text(inv.rest))
            },
        ))
        .register(Handler::new(
            "roll",
            "Roll dice.\n\n\
             Syntax: roll [NdM]\n\n\
             Options: defaults to 1d6 when no dice are given",
            |inv: Invocation, _ctx| async move { roll(&inv) },
        ))
        .register(Handler::new(
            "poll",
            "Post a poll: the question, then each option as its own message.\n\n\
             Syntax: poll <question> <option> <option> [more options]",
            |inv: Invocation, _ctx| async move {
                if inv.args.len() < 3 {
                    return Err(CommandError::args(
                        "A poll needs a question and at least two options.",
                    ));
                }
                let mut items: Vec<ResponseItem> = Vec::new();
                items.push(format!("📊 {}", inv.args[0]).into());
                items.push(ResponseItem::Flush);
                for (i, option) in inv.args[1..].iter().enumerate() {
                    items.push(format!("{}. {option}", i + 1).into());
                    items.push(ResponseItem::Flush);
                }
                Ok(Response::stream(futures::stream::iter(
                    items.into_iter().map(Ok),
                )))
            },
        ))
        .register(Handler::new(
            "commands",
            "List the custom commands defined on this bot.",
            |_inv, ctx: Context| async move {
                let words = ctx.customs.words();
                if words.is_empty() {
                    return Ok(Response::text("No custom commands defined."));
                }
                Ok(Response::text(format!("Custom commands: {}", words.join(", "))))
            },
        ))
}

fn help(slot: &RouterSlot, inv: &Invocation) -> Result<Response, CommandError> {
    let router = router_from(slot)?;

    let Some(word) = inv.arg(0) else {
        let mut lines = vec!["Available commands:".to_string()];
        for provider in router.providers() {
            let words = provider.command_words();
            if words.is_empty() {
                continue;
            }
            lines.push(format!("{}: {}", provider.name(), words.join(", ")));
        }
        lines.push("Use `help <command>` for details.".to_string());
        return Ok(Response::lines(lines));
    };

    let Some((_, handler)) = router.find_command(word) else {
        return Err(CommandError::input(format!("No such command: `{word}`")));
    };

    let doc = handler.doc();
    let mut lines = vec![format!("{} — {}", handler.name(), doc.summary)];
    if !doc.details.is_empty() {
        lines.push(doc.details.clone());
    }
    if let Some(syntax) = &doc.syntax {
        lines.push(format!("Syntax: {syntax}"));
    }
    if let Some(options) = &doc.options {
        lines.push(format!("Options: {options}"));
    }
    if !doc.has_detail() && doc.summary.is_empty() {
        lines.push("No detailed help available.".to_string());
    }
    Ok(Response::lines(lines))
}

fn roll(inv: &Invocation) -> Result<Response, CommandError> {
    let notation = inv.arg(0).unwrap_or("1d6");
    let (count, sides) = notation
        .split_once('d')
        .ok_or_else(|| CommandError::input(format!("`{notation}` is not dice notation (NdM).")))?;
    let count: u32 = count
        .parse()
        .map_err(|_| CommandError::input(format!("`{count}` is not a number of dice.")))?;
    let sides: u32 = sides
        .parse()
        .map_err(|_| CommandError::input(format!("`{sides}` is not a number of sides.")))?;
    if count == 0 || count > 100 || sides < 2 {
        return Err(CommandError::input(
            "Dice must be 1-100 rolls of at least 2 sides.",
        ));
    }

    let mut rng = rand::thread_rng();
    let rolls: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=sides)).collect();
    let total: u32 = rolls.iter().sum();
    let shown = rolls
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(" + ");
    Ok(Response::text(format!("🎲 {notation}: {shown} = {total}")))
}

fn moderation_commands() -> CommandSet {
    CommandSet::new("moderation", AuthRule::Role("moderator".to_string()))
        .register(Handler::new(
            "say",
            "Post a message into another channel as the bot.\n\n\
             Syntax: say <channel_id> <text>",
            |inv: Invocation, ctx: Context| async move {
                let Some(raw) = inv.arg(0) else {
                    return Err(CommandError::args("Syntax: say <channel_id> <text>"));
                };
                let channel = ChannelId(parse_i64(raw, "channel id")?);
                let text = inv.args[1..].join(" ");
                if text.is_empty() {
                    return Err(CommandError::args("Nothing to say."));
                }
                // The send happens while the response is drained.
                Ok(Response::defer(async move {
                    ctx.client
                        .send(channel, text.into())
                        .await
                        .map_err(|e| CommandError::operation(format!("Could not post: {e}")))?;
                    Ok(Response::text(format!("Posted to {channel}.")))
                }))
            },
        ))
        .register(Handler::new(
            "dm",
            "Send a direct message to a user.\n\nSyntax: dm <user_id> <text>",
            |inv: Invocation, ctx: Context| async move {
                let Some(raw) = inv.arg(0) else {
                    return Err(CommandError::args("Syntax: dm <user_id> <text>"));
                };
                let user = UserId(parse_i64(raw, "user id")?);
                let text = inv.args[1..].join(" ");
                if text.is_empty() {
                    return Err(CommandError::args("Nothing to send."));
                }
                let dm = ctx
                    .client
                    .create_dm(user)
                    .await
                    .map_err(|_| CommandError::input(format!("No reachable user `{user}`.")))?;
                ctx.client
                    .send(dm.id, text.into())
                    .await
                    .map_err(|e| CommandError::operation(format!("Could not send: {e}")))?;
                Ok(Response::text("Delivered."))
            },
        ))
        .register(Handler::new(
            "whois",
            "Show what the bot knows about a user.\n\nSyntax: whois <user_id>",
            |inv: Invocation, ctx: Context| async move {
                let Some(raw) = inv.arg(0) else {
                    return Err(CommandError::args("Syntax: whois <user_id>"));
                };
                let user = UserId(parse_i64(raw, "user id")?);
                let resolved = ctx
                    .client
                    .get_user(user)
                    .await
                    .map_err(|_| CommandError::input(format!("No reachable user `{user}`.")))?;
                let level = ctx.members.operator_level(user);
                let roles = ctx.members.roles(user);
                let embed = Embed::new()
                    .title(resolved.name)
                    .field("id", user.to_string())
                    .field("operator level", level.to_string())
                    .field(
                        "roles",
                        if roles.is_empty() {
                            "none".to_string()
                        } else {
                            roles.join(", ")
                        },
                    );
                Ok(Response::embed(embed))
            },
        ))
}

fn operator_commands(deps: &CommandDeps) -> CommandSet {
    let router_for_alias = Arc::clone(&deps.router);
    let router_for_custom = Arc::clone(&deps.router);
    let manager = Arc::clone(&deps.manager);

    CommandSet::new("operator", AuthRule::Level(2))
        .register(Handler::new(
            "alias",
            "Manage alternate invocation words.\n\n\
             Aliases never shadow real commands: direct lookups win on every\n\
             resolution, and creating a colliding alias is refused outright.\n\n\
             Syntax: alias add <alias> <command> | alias remove <alias> | alias list",
            move |inv: Invocation, ctx: Context| {
                let router = Arc::clone(&router_for_alias);
                async move { alias(&router, &inv, &ctx) }
            },
        ))
        .register(Handler::new(
            "command",
            "Define or remove a custom reply command.\n\n\
             Syntax: command define <word> <reply text> | command remove <word>\n\n\
             Options: --nsfw  restrict the command to permitted channels",
            move |inv: Invocation, ctx: Context| {
                let router = Arc::clone(&router_for_custom);
                async move { custom_command(&router, &inv, &ctx) }
            },
        ))
        .register(Handler::new(
            "level",
            "Set a member's operator level.\n\nSyntax: level <user_id> <level>",
            |inv: Invocation, ctx: Context| async move {
                let (Some(raw_user), Some(raw_level)) = (inv.arg(0), inv.arg(1)) else {
                    return Err(CommandError::args("Syntax: level <user_id> <level>"));
                };
                let user = UserId(parse_i64(raw_user, "user id")?);
                let level: u8 = raw_level
                    .parse()
                    .map_err(|_| CommandError::input(format!("`{raw_level}` is not a level.")))?;
                ctx.members.set_operator_level(user, level)?;
                Ok(Response::text(format!("{user} is now operator level {level}.")))
            },
        ))
        .register(Handler::new(
            "tunnel",
            "Manage channel tunnels.\n\n\
             Digging connects this channel with every listed channel or user\n\
             id and relays non-command messages between them until the tunnel\n\
             times out, is closed, or loses its endpoints.\n\n\
             Syntax: tunnel dig <id> [id...] | tunnel close <tunnel_id> | tunnel list\n\n\
             Options: --anon  relay without author attribution",
            move |inv: Invocation, ctx: Context| {
                let manager = Arc::clone(&manager);
                async move { tunnel(&manager, &inv, &ctx).await }
            },
        ))
        .register(Handler::new(
            "whitelist",
            "Manage the named id whitelists that gate whitelist-bound\n\
             commands.\n\n\
             Syntax: whitelist add <name> <user_id> | whitelist remove <name> <user_id>",
            |inv: Invocation, ctx: Context| async move { whitelist(&inv, &ctx) },
        ))
        .register(Handler::new(
            "report-here",
            "Route unhandled-error reports to this channel.",
            |inv: Invocation, ctx: Context| async move {
                let channel = inv.source.channel.id;
                ctx.config.set(|c| c.report_channel = Some(channel))?;
                Ok(Response::text("Error reports will land here."))
            },
        ))
}

fn whitelist(inv: &Invocation, ctx: &Context) -> Result<Response, CommandError> {
    let (Some(action), Some(name), Some(raw_user)) = (inv.arg(0), inv.arg(1), inv.arg(2)) else {
        return Err(CommandError::args(
            "Syntax: whitelist add|remove <name> <user_id>",
        ));
    };
    let user = UserId(parse_i64(raw_user, "user id")?);
    match action {
        "add" => {
            ctx.members.add_to_whitelist(name, user)?;
            Ok(Response::text(format!("{user} added to `{name}`.")))
        }
        "remove" => {
            ctx.members.remove_from_whitelist(name, user)?;
            Ok(Response::text(format!("{user} removed from `{name}`.")))
        }
        other => Err(CommandError::args(format!(
            "Unknown subcommand `{other}`. Syntax: whitelist add|remove <name> <user_id>"
        ))),
    }
}

fn alias(slot: &RouterSlot, inv: &Invocation, ctx: &Context) -> Result<Response, CommandError> {
    match inv.arg(0) {
        Some("add") => {
            let (Some(alias), Some(target)) = (inv.arg(1), inv.arg(2)) else {
                return Err(CommandError::args("Syntax: alias add <alias> <command>"));
            };
            let router = router_from(slot)?;
            if router.is_command(alias) {
                return Err(CommandError::input(format!(
                    "`{alias}` is already a command; aliases may not shadow real commands."
                )));
            }
            if !router.is_command(target) {
                return Err(CommandError::input(format!("Unknown command `{target}`.")));
            }
            ctx.aliases.set(alias, target)?;
            Ok(Response::text(format!("`{alias}` now invokes `{target}`.")))
        }
        Some("remove") => {
            let Some(alias) = inv.arg(1) else {
                return Err(CommandError::args("Syntax: alias remove <alias>"));
            };
            if ctx.aliases.remove(alias)? {
                Ok(Response::text(format!("Removed alias `{alias}`.")))
            } else {
                Err(CommandError::input(format!("No alias `{alias}`.")))
            }
        }
        Some("list") | None => {
            let all = ctx.aliases.all();
            if all.is_empty() {
                return Ok(Response::text("No aliases defined."));
            }
            Ok(Response::lines(
                all.into_iter()
                    .map(|(alias, target)| format!("{alias} → {target}")),
            ))
        }
        Some(other) => Err(CommandError::args(format!(
            "Unknown subcommand `{other}`. Syntax: alias add|remove|list"
        ))),
    }
}

fn custom_command(
    slot: &RouterSlot,
    inv: &Invocation,
    ctx: &Context,
) -> Result<Response, CommandError> {
    match inv.arg(0) {
        Some("define") => {
            let Some(word) = inv.arg(1) else {
                return Err(CommandError::args(
                    "Syntax: command define <word> <reply text>",
                ));
            };
            let router = router_from(slot)?;
            if router.is_command(word) && ctx.customs.get(word).is_none() {
                return Err(CommandError::input(format!(
                    "`{word}` is a built-in command and cannot be redefined."
                )));
            }
            let reply = inv.args[2..].join(" ");
            if reply.is_empty() {
                return Err(CommandError::args("The reply text is missing."));
            }
            ctx.customs.define(
                word,
                CustomCommand {
                    reply,
                    nsfw: inv.flag_set("nsfw"),
                    created_by: inv.source.author.id,
                    created_at: chrono::Utc::now(),
                },
            )?;
            Ok(Response::text(format!("Custom command `{word}` defined.")))
        }
        Some("remove") => {
            let Some(word) = inv.arg(1) else {
                return Err(CommandError::args("Syntax: command remove <word>"));
            };
            if ctx.customs.remove(word)? {
                Ok(Response::text(format!("Removed `{word}`.")))
            } else {
                Err(CommandError::input(format!("No custom command `{word}`.")))
            }
        }
        _ => Err(CommandError::args(
            "Syntax: command define <word> <reply text> | command remove <word>",
        )),
    }
}

async fn tunnel(
    manager: &Arc<TunnelManager>,
    inv: &Invocation,
    ctx: &Context,
) -> Result<Response, CommandError> {
    match inv.arg(0) {
        Some("dig") => {
            if inv.args.len() < 2 {
                return Err(CommandError::args("Syntax: tunnel dig <id> [id...]"));
            }
            let mut gates = vec![inv.source.channel.id.0];
            for raw in &inv.args[1..] {
                gates.push(parse_i64(raw, "channel or user id")?);
            }
            let config = ctx.config.get();
            match manager
                .dig(
                    inv.source.channel.id,
                    gates,
                    inv.flag_set("anon"),
                    Duration::from_secs(config.tunnel_timeout_secs),
                    config.prefix,
                )
                .await
            {
                Ok(id) => Ok(Response::text(format!("Tunnel `{}` dug.", id.short()))),
                Err(TunnelError::Setup { .. }) => Err(CommandError::operation(
                    "Tunnel setup failed; see the reports above.",
                )),
                Err(err) => Err(CommandError::operation(err.to_string())),
            }
        }
        Some("close") => {
            let Some(id) = inv.arg(1) else {
                return Err(CommandError::args("Syntax: tunnel close <tunnel_id>"));
            };
            if manager.kill(id, "Tunnel closed by an operator.").await {
                Ok(Response::none())
            } else {
                Err(CommandError::input(format!("No tunnel `{id}`.")))
            }
        }
        Some("list") | None => {
            let tunnels = manager.list();
            if tunnels.is_empty() {
                return Ok(Response::text("No live tunnels."));
            }
            Ok(Response::lines(tunnels.into_iter().map(|t| {
                format!(
                    "{} — {} [{}]",
                    t.id.short(),
                    t.channels.join(" ↔ "),
                    if t.active { "active" } else { "closing" }
                )
            })))
        }
        Some(other) => Err(CommandError::args(format!(
            "Unknown subcommand `{other}`. Syntax: tunnel dig|close|list"
        ))),
    }
}

fn owner_commands(deps: &CommandDeps) -> CommandSet {
    let shutdown = deps.shutdown.clone();

    CommandSet::new("owner", AuthRule::Sudo)
        .register(Handler::new(
            "devmode",
            "Toggle devmode message decoration.\n\nSyntax: devmode [on|off]",
            |inv: Invocation, ctx: Context| async move {
                let enable = match inv.arg(0) {
                    Some("on") => true,
                    Some("off") => false,
                    None => !ctx.config.get().devmode,
                    Some(other) => {
                        return Err(CommandError::args(format!(
                            "`{other}` is not on/off."
                        )))
                    }
                };
                ctx.config.set(|c| c.devmode = enable)?;
                Ok(Response::text(format!(
                    "Devmode {}.",
                    if enable { "enabled" } else { "disabled" }
                )))
            },
        ))
        .register(Handler::new(
            "shutdown",
            "Stop the bot process cleanly.",
            move |_inv, _ctx| {
                let shutdown = shutdown.clone();
                async move {
                    let _ = shutdown.send(()).await;
                    Ok(Response::text("Shutting down."))
                }
            },
        ))
}

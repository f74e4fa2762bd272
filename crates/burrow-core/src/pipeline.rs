//! The per-invocation pipeline: route, render, and catch.
//!
//! This is the only layer that catches command errors. Recoverable kinds
//! render as plain text to the invoking channel; unanticipated faults are
//! logged with full context, reported to the moderator channel, and
//! acknowledged to the user generically.

use std::sync::Arc;

use tracing::{debug, error, warn};

use burrow_models::{Embed, Message, MessageRef, SendPayload};

use crate::context::Context;
use crate::error::CommandError;
use crate::render::{Decorator, Renderer};
use crate::respond::Response;
use crate::router::Router;

/// Wires the router, renderer and error policy together for one bot.
pub struct CommandPipeline {
    router: Arc<Router>,
    ctx: Context,
    decorator: Option<Arc<Decorator>>,
}

impl CommandPipeline {
    pub fn new(router: Arc<Router>, ctx: Context) -> Self {
        Self {
            router,
            ctx,
            decorator: None,
        }
    }

    /// Install the devmode decoration hook, applied to every outbound text.
    pub fn with_decorator(mut self, decorator: Arc<Decorator>) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Handle one inbound message if it is command-prefixed.
    ///
    /// Returns `None` when the message carried no command prefix, otherwise
    /// the references of the replies this invocation produced (callers use
    /// them to wire edited-message re-rendering). With an `edit_target`
    /// (re-invocation after the user edited their message), the prior reply
    /// is edited or replaced per the renderer's rules.
    pub async fn handle_message(
        &self,
        message: &Message,
        edit_target: Option<MessageRef>,
    ) -> Option<Vec<MessageRef>> {
        let prefix = self.ctx.config.get().prefix;
        let line = message.text.strip_prefix(&prefix)?;

        let outcome = self.router.route(message, line, &self.ctx).await;

        let mut renderer = Renderer::new(self.ctx.client.as_ref(), message.channel.id);
        if let Some(decorator) = self.decorator.as_deref() {
            renderer = renderer.with_decorator(decorator);
        }

        match outcome {
            Ok(response) => match renderer.drain(response, edit_target).await {
                Ok(None) => {}
                Ok(Some(fault)) => self.escalate(fault, message).await,
                Err(err) => {
                    // Rendering itself failed; fall back to a plain reply.
                    self.reply_error(&err, message, None).await;
                    self.escalate(err, message).await;
                }
            },
            Err(err) => {
                let replies = self.reply_error(&err, message, edit_target).await;
                self.escalate(err, message).await;
                return Some(replies);
            }
        }
        Some(renderer.sent_refs().to_vec())
    }

    /// Render an error as the invocation's single reply.
    async fn reply_error(
        &self,
        err: &CommandError,
        message: &Message,
        edit_target: Option<MessageRef>,
    ) -> Vec<MessageRef> {
        let Some(text) = err.user_text() else {
            // A clean, silent exit.
            return Vec::new();
        };
        let mut renderer = Renderer::new(self.ctx.client.as_ref(), message.channel.id);
        if let Some(decorator) = self.decorator.as_deref() {
            renderer = renderer.with_decorator(decorator);
        }
        if let Err(send_err) = renderer.drain(Response::text(text), edit_target).await {
            warn!(
                channel = %message.channel.id,
                error = %send_err,
                "failed to deliver error reply"
            );
        }
        renderer.sent_refs().to_vec()
    }

    /// Log a fault and report it to the moderator channel, when one is
    /// configured. Recoverable kinds only get a debug line.
    async fn escalate(&self, err: CommandError, message: &Message) {
        if !err.is_fault() {
            debug!(
                channel = %message.channel.id,
                user = %message.author.id,
                error = %err,
                "command ended with a user-facing error"
            );
            return;
        }

        error!(
            channel = %message.channel.id,
            user = %message.author.id,
            invoker = %message.author.name,
            text = %message.text,
            error = %err,
            "unhandled command fault"
        );

        let Some(report_channel) = self.ctx.config.get().report_channel else {
            return;
        };
        let embed = Embed::new()
            .title("Unhandled command error")
            .field("invoker", format!("{} ({})", message.author.name, message.author.id))
            .field("channel", format!("{} ({})", message.channel.name, message.channel.id))
            .field("command", message.text.clone())
            .description(err.to_string());
        if let Err(report_err) = self
            .ctx
            .client
            .send(report_channel, SendPayload::embed(embed))
            .await
        {
            warn!(error = %report_err, "failed to report fault to moderator channel");
        }
    }
}

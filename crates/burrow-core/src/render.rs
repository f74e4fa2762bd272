//! Response rendering: turning handler output into outbound sends.

use futures::future::BoxFuture;
use futures::StreamExt;

use burrow_models::{ChannelId, MessageRef, SendPayload};
use burrow_platform::ChatClient;

use crate::error::{CommandError, Result};
use crate::respond::{Response, ResponseItem};

/// Hook applied to every outbound text (devmode decoration).
pub type Decorator = dyn Fn(&str) -> String + Send + Sync;

/// Renders one response into zero or more sends to a single channel.
///
/// Text items accumulate in a line buffer that persists across items within
/// one drain; `Flush` joins and sends it, `Discard` drops it, and the end of
/// the drain performs an implicit flush. Payloads and embeds bypass the
/// buffer and go out immediately, preserving production order.
pub struct Renderer<'a> {
    client: &'a dyn ChatClient,
    channel: ChannelId,
    decorator: Option<&'a Decorator>,
    buffer: Vec<String>,
    sent: Vec<MessageRef>,
}

impl<'a> Renderer<'a> {
    pub fn new(client: &'a dyn ChatClient, channel: ChannelId) -> Self {
        Self {
            client,
            channel,
            decorator: None,
            buffer: Vec::new(),
            sent: Vec::new(),
        }
    }

    pub fn with_decorator(mut self, decorator: &'a Decorator) -> Self {
        self.decorator = Some(decorator);
        self
    }

    /// References of the messages this renderer has sent, in order.
    pub fn sent_refs(&self) -> &[MessageRef] {
        &self.sent
    }

    /// Drain a response, sending as items are produced.
    ///
    /// With an `edit_target`, a single concrete value edits that message in
    /// place; a sequence-shaped response deletes the target first, since
    /// multiple messages cannot cleanly replace one.
    ///
    /// Returns `Ok(Some(err))` when a mid-stream handler failure was already
    /// rendered as the final item (partial output stays visible); the caller
    /// only needs to escalate it. `Err` means platform I/O itself failed.
    pub async fn drain(
        &mut self,
        response: Response,
        edit_target: Option<MessageRef>,
    ) -> Result<Option<CommandError>> {
        let resolved = response.resolve().await?;

        if let Some(target) = edit_target {
            if !resolved.is_sequence() {
                return self.replace(target, resolved).await.map(|_| None);
            }
            // Sequences start fresh.
            self.client.delete(target).await?;
        }

        match resolved {
            Response::Nothing => Ok(None),
            Response::Item(item) => {
                self.render_item(item).await?;
                self.flush().await?;
                Ok(None)
            }
            Response::Many(items) => {
                for item in items {
                    self.render_item(item).await?;
                }
                self.flush().await?;
                Ok(None)
            }
            Response::Stream(mut stream) => {
                while let Some(next) = stream.next().await {
                    match next {
                        Ok(item) => self.render_item(item).await?,
                        Err(err) => {
                            // Partial output stays; the failure is appended
                            // as one more rendered item.
                            if let Some(text) = err.user_text() {
                                self.buffer.push(text);
                            }
                            self.flush().await?;
                            return Ok(Some(err));
                        }
                    }
                }
                self.flush().await?;
                Ok(None)
            }
            Response::Deferred(_) => unreachable!("resolve() removed deferreds"),
        }
    }

    /// Edit `target` in place with a single concrete value.
    async fn replace(&mut self, target: MessageRef, resolved: Response) -> Result<()> {
        let payload = match resolved {
            Response::Item(ResponseItem::Text(text)) => Some(SendPayload::text(text)),
            Response::Item(ResponseItem::Embed(embed)) => Some(SendPayload::embed(embed)),
            Response::Item(ResponseItem::Payload(payload)) => Some(payload),
            // Nothing to show: the stale reply goes away.
            _ => None,
        };
        match payload {
            Some(payload) => {
                self.client.edit(target, self.decorate(payload)).await?;
                self.sent.push(target);
            }
            None => self.client.delete(target).await?,
        }
        Ok(())
    }

    fn render_item<'s>(&'s mut self, item: ResponseItem) -> BoxFuture<'s, Result<()>> {
        Box::pin(async move {
            match item {
                ResponseItem::Text(text) => self.buffer.push(text),
                ResponseItem::Payload(payload) => {
                    let payload = self.decorate(payload);
                    if !payload.is_empty() {
                        let sent = self.client.send(self.channel, payload).await?;
                        self.sent.push(sent);
                    }
                }
                ResponseItem::Embed(embed) => {
                    let sent = self
                        .client
                        .send(self.channel, SendPayload::embed(embed))
                        .await?;
                    self.sent.push(sent);
                }
                ResponseItem::Flush => self.flush().await?,
                ResponseItem::Discard => self.buffer.clear(),
                ResponseItem::Group(items) => {
                    for item in items {
                        self.render_item(item).await?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Send the buffered lines as one message, if any.
    async fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let text = self.buffer.join("\n");
        self.buffer.clear();
        let payload = self.decorate(SendPayload::text(text));
        let sent = self.client.send(self.channel, payload).await?;
        self.sent.push(sent);
        Ok(())
    }

    fn decorate(&self, mut payload: SendPayload) -> SendPayload {
        if let Some(decorator) = self.decorator {
            if let Some(content) = payload.content.take() {
                payload.content = Some(decorator(&content));
            }
        }
        payload
    }
}

//! The value a handler produces, before rendering.
//!
//! Handlers come in four shapes (a plain value, a synchronous sequence, an
//! asynchronous stream, or a future resolving to any of those), modeled here
//! as one tagged union so the renderer only ever deals with one type.

use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, Stream, StreamExt};

use burrow_models::{Embed, SendPayload};

use crate::error::Result;

/// One renderable unit within a response.
#[derive(Debug)]
pub enum ResponseItem {
    /// A line of text, appended to the renderer's buffer.
    Text(String),
    /// Raw send parameters, sent immediately, bypassing the buffer.
    Payload(SendPayload),
    /// A rich embed, sent immediately.
    Embed(Embed),
    /// Flush the buffer as one message.
    Flush,
    /// Drop the buffer without sending.
    Discard,
    /// A nested sequence, rendered element by element in order.
    Group(Vec<ResponseItem>),
}

impl From<String> for ResponseItem {
    fn from(text: String) -> Self {
        ResponseItem::Text(text)
    }
}

impl From<&str> for ResponseItem {
    fn from(text: &str) -> Self {
        ResponseItem::Text(text.to_string())
    }
}

impl From<Embed> for ResponseItem {
    fn from(embed: Embed) -> Self {
        ResponseItem::Embed(embed)
    }
}

impl From<SendPayload> for ResponseItem {
    fn from(payload: SendPayload) -> Self {
        ResponseItem::Payload(payload)
    }
}

/// `true` flushes the buffer, `false` discards it.
impl From<bool> for ResponseItem {
    fn from(flush: bool) -> Self {
        if flush {
            ResponseItem::Flush
        } else {
            ResponseItem::Discard
        }
    }
}

impl<T: Into<ResponseItem>> From<Vec<T>> for ResponseItem {
    fn from(items: Vec<T>) -> Self {
        ResponseItem::Group(items.into_iter().map(Into::into).collect())
    }
}

/// What one handler invocation produced.
pub enum Response {
    /// Silent success.
    Nothing,
    /// A single concrete value.
    Item(ResponseItem),
    /// A synchronous sequence, already materialized.
    Many(Vec<ResponseItem>),
    /// An asynchronous sequence, drained item by item; later items may
    /// depend on earlier ones having been sent, so the renderer never
    /// collects it eagerly.
    Stream(BoxStream<'static, Result<ResponseItem>>),
    /// Deferred work resolving to another response (recursively).
    Deferred(BoxFuture<'static, Result<Response>>),
}

impl Response {
    pub fn none() -> Self {
        Response::Nothing
    }

    pub fn text(text: impl Into<String>) -> Self {
        Response::Item(ResponseItem::Text(text.into()))
    }

    pub fn embed(embed: Embed) -> Self {
        Response::Item(ResponseItem::Embed(embed))
    }

    pub fn payload(payload: SendPayload) -> Self {
        Response::Item(ResponseItem::Payload(payload))
    }

    pub fn items(items: Vec<ResponseItem>) -> Self {
        Response::Many(items)
    }

    /// Build a multi-line text response flushed as one message.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Response::Many(
            lines
                .into_iter()
                .map(|l| ResponseItem::Text(l.into()))
                .collect(),
        )
    }

    pub fn stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<ResponseItem>> + Send + 'static,
    {
        Response::Stream(stream.boxed())
    }

    pub fn defer<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Result<Response>> + Send + 'static,
    {
        Response::Deferred(future.boxed())
    }

    /// Await the deferred chain (possibly repeatedly) until the response is
    /// a concrete value or a sequence.
    pub async fn resolve(self) -> Result<Response> {
        let mut response = self;
        loop {
            match response {
                Response::Deferred(future) => response = future.await?,
                other => return Ok(other),
            }
        }
    }

    /// Whether the resolved response is sequence-shaped (its rendering may
    /// produce multiple messages that cannot cleanly replace an edit
    /// target).
    pub fn is_sequence(&self) -> bool {
        matches!(
            self,
            Response::Many(_) | Response::Stream(_) | Response::Item(ResponseItem::Group(_))
        )
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Response::Nothing => write!(f, "Nothing"),
            Response::Item(item) => f.debug_tuple("Item").field(item).finish(),
            Response::Many(items) => f.debug_tuple("Many").field(items).finish(),
            Response::Stream(_) => write!(f, "Stream(..)"),
            Response::Deferred(_) => write!(f, "Deferred(..)"),
        }
    }
}

impl From<String> for Response {
    fn from(text: String) -> Self {
        Response::text(text)
    }
}

impl From<&str> for Response {
    fn from(text: &str) -> Self {
        Response::text(text)
    }
}

impl From<Embed> for Response {
    fn from(embed: Embed) -> Self {
        Response::embed(embed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;

    #[tokio::test]
    async fn test_resolve_unwraps_nested_deferreds() {
        let response = Response::defer(async {
            Ok(Response::defer(async { Ok(Response::text("deep")) }))
        });
        let resolved = response.resolve().await.unwrap();
        match resolved {
            Response::Item(ResponseItem::Text(text)) => assert_eq!(text, "deep"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resolve_propagates_error() {
        let response = Response::defer(async {
            Err(CommandError::operation("backend unavailable"))
        });
        assert!(response.resolve().await.is_err());
    }

    #[test]
    fn test_bool_signals() {
        assert!(matches!(ResponseItem::from(true), ResponseItem::Flush));
        assert!(matches!(ResponseItem::from(false), ResponseItem::Discard));
    }

    #[test]
    fn test_sequence_shapes() {
        assert!(Response::lines(["a", "b"]).is_sequence());
        assert!(Response::Item(ResponseItem::Group(vec![])).is_sequence());
        assert!(!Response::text("x").is_sequence());
        assert!(!Response::Nothing.is_sequence());
    }
}

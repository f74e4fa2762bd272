//! In-memory chat client used by tests.
//!
//! Records every outbound call so router, renderer and tunnel behavior can
//! be asserted end-to-end without a live platform. Sends to a channel marked
//! failing return [`PlatformError::Send`], which is how broadcast-failure
//! paths are exercised.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use burrow_models::{Channel, ChannelId, Message, MessageId, MessageRef, SendPayload, User, UserId};

use crate::client::ChatClient;
use crate::error::{PlatformError, Result};

/// One recorded outbound send.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub channel: ChannelId,
    pub payload: SendPayload,
    pub reference: MessageRef,
}

#[derive(Default)]
struct Inner {
    channels: HashMap<ChannelId, Channel>,
    users: HashMap<UserId, User>,
    sent: Vec<SentRecord>,
    edits: Vec<(MessageRef, SendPayload)>,
    deletes: Vec<MessageRef>,
    failing: HashSet<ChannelId>,
    next_message_id: i64,
}

/// An in-memory [`ChatClient`].
pub struct MemoryClient {
    bot: UserId,
    inner: Mutex<Inner>,
}

impl MemoryClient {
    pub fn new(bot: UserId) -> Self {
        Self {
            bot,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Register a channel the client can resolve and send to.
    pub fn add_channel(&self, channel: Channel) {
        self.inner
            .lock()
            .unwrap()
            .channels
            .insert(channel.id, channel);
    }

    /// Register a user the client can resolve.
    pub fn add_user(&self, user: User) {
        self.inner.lock().unwrap().users.insert(user.id, user);
    }

    /// Make every future send to `channel` fail.
    pub fn fail_channel(&self, channel: ChannelId) {
        self.inner.lock().unwrap().failing.insert(channel);
    }

    /// All recorded sends, in order.
    pub fn sent(&self) -> Vec<SentRecord> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Payloads sent to one channel, in order.
    pub fn sent_to(&self, channel: ChannelId) -> Vec<SendPayload> {
        self.inner
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|r| r.channel == channel)
            .map(|r| r.payload.clone())
            .collect()
    }

    /// Text contents sent to one channel, in order; embeds and files render
    /// as empty strings.
    pub fn texts_to(&self, channel: ChannelId) -> Vec<String> {
        self.sent_to(channel)
            .into_iter()
            .map(|p| p.content.unwrap_or_default())
            .collect()
    }

    /// All recorded edits, in order.
    pub fn edits(&self) -> Vec<(MessageRef, SendPayload)> {
        self.inner.lock().unwrap().edits.clone()
    }

    /// All recorded deletes, in order.
    pub fn deletes(&self) -> Vec<MessageRef> {
        self.inner.lock().unwrap().deletes.clone()
    }

    /// Build an inbound message from a registered user in a registered
    /// channel, for driving dispatchers and waiters in tests.
    pub fn inbound(&self, channel: ChannelId, author: UserId, text: &str) -> Message {
        let inner = self.inner.lock().unwrap();
        let channel = inner
            .channels
            .get(&channel)
            .cloned()
            .unwrap_or_else(|| Channel::group(channel, "unknown"));
        let author = inner
            .users
            .get(&author)
            .cloned()
            .unwrap_or_else(|| User::new(author, "unknown"));
        Message::new(MessageId(0), channel, author, text)
    }
}

#[async_trait]
impl ChatClient for MemoryClient {
    async fn send(&self, channel: ChannelId, payload: SendPayload) -> Result<MessageRef> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.channels.contains_key(&channel) {
            return Err(PlatformError::ChannelNotFound(channel));
        }
        if inner.failing.contains(&channel) {
            return Err(PlatformError::Send(format!("channel {channel} unreachable")));
        }
        inner.next_message_id += 1;
        let reference = MessageRef {
            channel,
            message: MessageId(inner.next_message_id),
        };
        inner.sent.push(SentRecord {
            channel,
            payload,
            reference,
        });
        Ok(reference)
    }

    async fn edit(&self, message: MessageRef, payload: SendPayload) -> Result<()> {
        self.inner.lock().unwrap().edits.push((message, payload));
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<()> {
        self.inner.lock().unwrap().deletes.push(message);
        Ok(())
    }

    async fn get_channel(&self, id: ChannelId) -> Result<Channel> {
        self.inner
            .lock()
            .unwrap()
            .channels
            .get(&id)
            .cloned()
            .ok_or(PlatformError::ChannelNotFound(id))
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        self.inner
            .lock()
            .unwrap()
            .users
            .get(&id)
            .cloned()
            .ok_or(PlatformError::UserNotFound(id))
    }

    async fn create_dm(&self, user: UserId) -> Result<Channel> {
        let mut inner = self.inner.lock().unwrap();
        let name = inner
            .users
            .get(&user)
            .map(|u| u.name.clone())
            .ok_or(PlatformError::UserNotFound(user))?;
        // DMs share the user's id, as on platforms where a private chat id
        // is the peer's id.
        let dm = Channel::direct(ChannelId(user.0), name);
        inner.channels.insert(dm.id, dm.clone());
        Ok(dm)
    }

    fn bot_id(&self) -> UserId {
        self.bot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_records_in_order() {
        let client = MemoryClient::new(UserId(999));
        client.add_channel(Channel::group(ChannelId(1), "general"));

        client.send(ChannelId(1), "first".into()).await.unwrap();
        client.send(ChannelId(1), "second".into()).await.unwrap();

        assert_eq!(client.texts_to(ChannelId(1)), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_send_to_unknown_channel_fails() {
        let client = MemoryClient::new(UserId(999));
        let err = client.send(ChannelId(404), "x".into()).await.unwrap_err();
        assert!(matches!(err, PlatformError::ChannelNotFound(_)));
    }

    #[tokio::test]
    async fn test_failing_channel() {
        let client = MemoryClient::new(UserId(999));
        client.add_channel(Channel::group(ChannelId(1), "general"));
        client.fail_channel(ChannelId(1));

        let err = client.send(ChannelId(1), "x".into()).await.unwrap_err();
        assert!(matches!(err, PlatformError::Send(_)));
        assert!(client.sent().is_empty());
    }

    #[tokio::test]
    async fn test_create_dm_registers_channel() {
        let client = MemoryClient::new(UserId(999));
        client.add_user(User::new(UserId(42), "bob"));

        let dm = client.create_dm(UserId(42)).await.unwrap();
        assert_eq!(dm.id, ChannelId(42));

        client.send(dm.id, "psst".into()).await.unwrap();
        assert_eq!(client.texts_to(dm.id), vec!["psst"]);
    }
}

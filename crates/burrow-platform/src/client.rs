//! The outbound platform client trait.

use async_trait::async_trait;

use burrow_models::{Channel, ChannelId, MessageRef, SendPayload, User, UserId};

use crate::error::Result;

/// Outbound I/O against the chat platform.
///
/// Every call is a suspension point and every call is fallible; adapters
/// translate their SDK's failures into [`crate::PlatformError`].
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Send a payload to a channel, returning a reference to the sent
    /// message for later edits or deletes.
    async fn send(&self, channel: ChannelId, payload: SendPayload) -> Result<MessageRef>;

    /// Edit a previously sent message in place.
    async fn edit(&self, message: MessageRef, payload: SendPayload) -> Result<()>;

    /// Delete a message.
    async fn delete(&self, message: MessageRef) -> Result<()>;

    /// Resolve a channel id to a live handle.
    async fn get_channel(&self, id: ChannelId) -> Result<Channel>;

    /// Resolve a user id.
    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Open (or reuse) a direct channel with a user.
    async fn create_dm(&self, user: UserId) -> Result<Channel>;

    /// The bot's own user id, used to filter our own messages out of
    /// relays and waits.
    fn bot_id(&self) -> UserId;
}

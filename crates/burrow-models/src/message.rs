//! Inbound message and channel types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, MessageId, UserId};

/// What kind of channel a message lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A shared group channel.
    Group,
    /// A one-on-one direct channel with a user.
    Direct,
}

/// A resolved, live channel handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// Human-readable name, used in tunnel notices and quotes.
    pub name: String,
    pub kind: ChannelKind,
}

impl Channel {
    pub fn group(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ChannelKind::Group,
        }
    }

    pub fn direct(id: ChannelId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ChannelKind::Direct,
        }
    }
}

/// The author of a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Whether this account is a bot (our own sends come back flagged).
    pub is_bot: bool,
    /// Platform roles attached to the author, as resolved by the adapter.
    pub roles: Vec<String>,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_bot: false,
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Check whether the author carries a named role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

/// An inbound message as seen by the dispatcher, waiters and tunnels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub channel: Channel,
    pub author: User,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(id: MessageId, channel: Channel, author: User, text: impl Into<String>) -> Self {
        Self {
            id,
            channel,
            author,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Stable reference to this message for edit/delete calls.
    pub fn reference(&self) -> crate::outbound::MessageRef {
        crate::outbound::MessageRef {
            channel: self.channel.id,
            message: self.id,
        }
    }
}

//! Outbound payload types: what the bot sends back to the platform.

use serde::{Deserialize, Serialize};

use crate::ids::{ChannelId, MessageId};

/// A single field of a rich embed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rich embed. Adapters that have no native embed support render it as
/// formatted text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Raw parameters for one "send a message" call against the platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendPayload {
    pub content: Option<String>,
    pub embed: Option<Embed>,
    /// Path of a file attachment, if any.
    pub file: Option<String>,
}

impl SendPayload {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    pub fn embed(embed: Embed) -> Self {
        Self {
            embed: Some(embed),
            ..Self::default()
        }
    }

    /// True when the payload carries nothing sendable.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().map_or(true, str::is_empty)
            && self.embed.is_none()
            && self.file.is_none()
    }
}

impl From<String> for SendPayload {
    fn from(content: String) -> Self {
        Self::text(content)
    }
}

impl From<&str> for SendPayload {
    fn from(content: &str) -> Self {
        Self::text(content)
    }
}

impl From<Embed> for SendPayload {
    fn from(embed: Embed) -> Self {
        Self::embed(embed)
    }
}

/// Reference to a message the bot already sent (or received), usable for
/// in-place edits and deletes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: ChannelId,
    pub message: MessageId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_is_empty() {
        assert!(SendPayload::default().is_empty());
        assert!(SendPayload::text("").is_empty());
        assert!(!SendPayload::text("hi").is_empty());
        assert!(!SendPayload::embed(Embed::new().title("t")).is_empty());
    }

    #[test]
    fn test_embed_builder() {
        let embed = Embed::new()
            .title("Relay")
            .description("body")
            .field("from", "alice")
            .footer("via tunnel");
        assert_eq!(embed.title.as_deref(), Some("Relay"));
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.fields[0].name, "from");
    }
}

//! teloxide-backed implementation of the platform client.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use tracing::debug;

use burrow_models::{
    Channel, ChannelId, ChannelKind, Embed, Message, MessageId, MessageRef, SendPayload, User,
    UserId,
};
use burrow_platform::{ChatClient, PlatformError, Result};

/// Escape HTML special characters for Telegram HTML mode.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Render an embed as Telegram HTML. Telegram has no native embeds, so the
/// structure is approximated with bold/italic formatting.
pub fn embed_to_html(embed: &Embed) -> String {
    let mut out = String::new();
    if let Some(title) = &embed.title {
        out.push_str(&format!("<b>{}</b>\n", html_escape(title)));
    }
    if let Some(description) = &embed.description {
        out.push_str(&html_escape(description));
        out.push('\n');
    }
    for field in &embed.fields {
        out.push_str(&format!(
            "<b>{}</b>: {}\n",
            html_escape(&field.name),
            html_escape(&field.value)
        ));
    }
    if let Some(footer) = &embed.footer {
        out.push_str(&format!("<i>{}</i>", html_escape(footer)));
    }
    out.trim_end().to_string()
}

/// The Telegram platform client.
pub struct TelegramClient {
    bot: Bot,
    bot_user: UserId,
}

impl TelegramClient {
    pub fn new(bot: Bot, bot_user: UserId) -> Self {
        Self { bot, bot_user }
    }

    /// Convert an inbound teloxide message into the platform-agnostic
    /// shape. Messages without text or an author are ignored.
    pub fn convert_message(message: &teloxide::types::Message) -> Option<Message> {
        let text = message.text().or_else(|| message.caption())?;
        let from = message.from.as_ref()?;
        let name = from
            .username
            .clone()
            .unwrap_or_else(|| from.first_name.clone());

        let channel = Channel {
            id: ChannelId(message.chat.id.0),
            name: message
                .chat
                .title()
                .or(message.chat.username())
                .unwrap_or("direct")
                .to_string(),
            kind: if message.chat.is_private() {
                ChannelKind::Direct
            } else {
                ChannelKind::Group
            },
        };

        let mut user = User::new(UserId(from.id.0 as i64), name);
        user.is_bot = from.is_bot;

        Some(Message::new(
            MessageId(message.id.0 as i64),
            channel,
            user,
            text,
        ))
    }

    fn to_chat_id(channel: ChannelId) -> teloxide::types::ChatId {
        teloxide::types::ChatId(channel.0)
    }

    fn to_message_id(message: MessageId) -> teloxide::types::MessageId {
        teloxide::types::MessageId(message.0 as i32)
    }

    /// Flatten a payload to the HTML text Telegram will receive.
    fn payload_text(payload: &SendPayload) -> Option<String> {
        match (&payload.content, &payload.embed) {
            (Some(content), Some(embed)) => Some(format!(
                "{}\n{}",
                html_escape(content),
                embed_to_html(embed)
            )),
            (Some(content), None) => Some(html_escape(content)),
            (None, Some(embed)) => Some(embed_to_html(embed)),
            (None, None) => None,
        }
    }
}

#[async_trait]
impl ChatClient for TelegramClient {
    async fn send(&self, channel: ChannelId, payload: SendPayload) -> Result<MessageRef> {
        let chat_id = Self::to_chat_id(channel);

        if let Some(path) = &payload.file {
            let sent = self
                .bot
                .send_document(chat_id, InputFile::file(path.clone()))
                .await
                .map_err(|e| PlatformError::Send(e.to_string()))?;
            return Ok(MessageRef {
                channel,
                message: MessageId(sent.id.0 as i64),
            });
        }

        let text = Self::payload_text(&payload)
            .ok_or_else(|| PlatformError::Send("empty payload".to_string()))?;
        let sent = self
            .bot
            .send_message(chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| PlatformError::Send(e.to_string()))?;

        debug!(channel = %channel, "message sent");
        Ok(MessageRef {
            channel,
            message: MessageId(sent.id.0 as i64),
        })
    }

    async fn edit(&self, message: MessageRef, payload: SendPayload) -> Result<()> {
        let text = Self::payload_text(&payload)
            .ok_or_else(|| PlatformError::Send("empty payload".to_string()))?;
        self.bot
            .edit_message_text(
                Self::to_chat_id(message.channel),
                Self::to_message_id(message.message),
                text,
            )
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| PlatformError::Send(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, message: MessageRef) -> Result<()> {
        self.bot
            .delete_message(
                Self::to_chat_id(message.channel),
                Self::to_message_id(message.message),
            )
            .await
            .map_err(|e| PlatformError::Send(e.to_string()))?;
        Ok(())
    }

    async fn get_channel(&self, id: ChannelId) -> Result<Channel> {
        let chat = self
            .bot
            .get_chat(Self::to_chat_id(id))
            .await
            .map_err(|_| PlatformError::ChannelNotFound(id))?;
        Ok(Channel {
            id,
            name: chat
                .title()
                .or(chat.username())
                .or(chat.first_name())
                .unwrap_or("unknown")
                .to_string(),
            kind: if chat.is_private() {
                ChannelKind::Direct
            } else {
                ChannelKind::Group
            },
        })
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        // A private chat's id is the peer's user id.
        let chat = self
            .bot
            .get_chat(teloxide::types::ChatId(id.0))
            .await
            .map_err(|_| PlatformError::UserNotFound(id))?;
        if !chat.is_private() {
            return Err(PlatformError::UserNotFound(id));
        }
        Ok(User::new(
            id,
            chat.username()
                .or(chat.first_name())
                .unwrap_or("unknown")
                .to_string(),
        ))
    }

    async fn create_dm(&self, user: UserId) -> Result<Channel> {
        let resolved = self.get_user(user).await?;
        Ok(Channel::direct(ChannelId(user.0), resolved.name))
    }

    fn bot_id(&self) -> UserId {
        self.bot_user
    }
}

//! The slice of the messaging platform the engine consumes.

use {
    async_trait::async_trait,
    chrono::{DateTime, Utc},
};

use crate::Result;

/// A message as observed in a channel's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub id: String,
    pub author_id: String,
    /// Plain text body; empty for card-only posts.
    pub content: String,
    /// Footer text of each attached card, in order. `None` for a card without footer.
    pub card_footers: Vec<Option<String>>,
}

impl ChannelMessage {
    pub fn is_card(&self) -> bool {
        !self.card_footers.is_empty()
    }
}

/// What gets posted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePayload {
    Text(String),
    Card(RichCard),
}

/// Structured message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichCard {
    pub title: Option<String>,
    pub description: String,
    pub footer: Option<String>,
    /// `#RRGGBB` or `#RGB`.
    pub color: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub fields: Vec<CardField>,
}

impl RichCard {
    pub fn new(description: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            title: None,
            description: description.into(),
            footer: None,
            color: color.into(),
            timestamp: None,
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub name: String,
    pub value: String,
}

/// Channel metadata used for rendering and server-scoped listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub id: String,
    pub name: String,
    pub guild_id: Option<String>,
    pub guild_name: String,
    pub member_count: u64,
}

/// Messaging platform client.
///
/// Every call may fail; implementations report a missing channel as
/// [`crate::Error::ChannelNotFound`] and everything transient as
/// [`crate::Error::Platform`].
#[async_trait]
pub trait MessagingPlatform: Send + Sync {
    /// User ID the bot posts as, once connected.
    fn self_user_id(&self) -> Option<String>;

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo>;

    async fn send_message(&self, channel_id: &str, payload: MessagePayload)
    -> Result<ChannelMessage>;

    /// `Ok(None)` when the message does not exist.
    async fn fetch_message(&self, channel_id: &str, message_id: &str)
    -> Result<Option<ChannelMessage>>;

    /// Most recent messages, newest first.
    async fn fetch_recent_messages(&self, channel_id: &str, limit: u8)
    -> Result<Vec<ChannelMessage>>;

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()>;
}

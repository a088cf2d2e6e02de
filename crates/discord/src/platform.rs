//! Serenity-backed [`MessagingPlatform`].

use std::sync::{Arc, RwLock};

use {
    async_trait::async_trait,
    serenity::{
        all::{
            Cache, Channel, ChannelId, Colour, CreateEmbed, CreateEmbedFooter, CreateMessage,
            GetMessages, Http, HttpError, Message, MessageId, Timestamp, UserId,
        },
        Error as SerenityError,
    },
    tracing::debug,
};

use stickybot_sticky::{
    Error, MessagingPlatform, Result,
    color::color_to_rgb,
    platform::{ChannelInfo, ChannelMessage, MessagePayload, RichCard},
};

/// Discord JSON error codes that mean the target is gone.
const UNKNOWN_CHANNEL: isize = 10003;
const UNKNOWN_MESSAGE: isize = 10008;
/// The bot can no longer see the channel (kicked, or permissions revoked).
const MISSING_ACCESS: isize = 50001;

/// Discord client handle shared with the engine.
///
/// Starts detached; [`DiscordPlatform::attach`] wires in the gateway's HTTP
/// client, its cache and the bot's user once the `ready` event arrives. Until
/// then every call fails with [`Error::Unavailable`].
#[derive(Default)]
pub struct DiscordPlatform {
    http: RwLock<Option<Arc<Http>>>,
    cache: RwLock<Option<Arc<Cache>>>,
    bot_user_id: RwLock<Option<UserId>>,
}

impl DiscordPlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attach(&self, http: Arc<Http>, cache: Arc<Cache>, bot_user_id: UserId) {
        *self.http.write().unwrap_or_else(|e| e.into_inner()) = Some(http);
        *self.cache.write().unwrap_or_else(|e| e.into_inner()) = Some(cache);
        *self.bot_user_id.write().unwrap_or_else(|e| e.into_inner()) = Some(bot_user_id);
    }

    fn http(&self) -> Result<Arc<Http>> {
        self.http
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| Error::unavailable("discord client is not connected yet"))
    }

    /// Channel and guild details from the gateway cache, if both are present.
    ///
    /// Cache refs are dropped before returning so nothing is held across an
    /// await point.
    fn cached_channel_info(&self, channel_id: ChannelId) -> Option<ChannelInfo> {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner()).clone()?;
        let (name, guild_id) = {
            let channel = cache.channel(channel_id)?;
            (channel.name.clone(), channel.guild_id)
        };
        let (guild_name, member_count) = {
            let guild = cache.guild(guild_id)?;
            (guild.name.clone(), guild.member_count)
        };
        Some(ChannelInfo {
            id: channel_id.to_string(),
            name,
            guild_id: Some(guild_id.to_string()),
            guild_name,
            member_count,
        })
    }
}

#[async_trait]
impl MessagingPlatform for DiscordPlatform {
    fn self_user_id(&self) -> Option<String> {
        self.bot_user_id
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .map(|id| id.to_string())
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        let http = self.http()?;
        let id = parse_channel_id(channel_id)?;
        if let Some(info) = self.cached_channel_info(id) {
            return Ok(info);
        }

        let channel = id
            .to_channel(&*http)
            .await
            .map_err(|e| classify("fetch channel", channel_id, Lookup::Channel, e))?;

        match channel {
            Channel::Guild(channel) => {
                let (guild_name, member_count) =
                    match channel.guild_id.to_partial_guild_with_counts(&*http).await {
                        Ok(guild) => (guild.name, guild.approximate_member_count.unwrap_or(0)),
                        Err(e) => {
                            debug!(channel_id, error = %e, "could not fetch guild for channel");
                            (String::new(), 0)
                        },
                    };
                Ok(ChannelInfo {
                    id: channel_id.to_string(),
                    name: channel.name,
                    guild_id: Some(channel.guild_id.to_string()),
                    guild_name,
                    member_count,
                })
            },
            Channel::Private(channel) => Ok(ChannelInfo {
                id: channel_id.to_string(),
                name: channel.name(),
                guild_id: None,
                guild_name: String::new(),
                member_count: 0,
            }),
            _ => Err(Error::unavailable(format!(
                "channel {channel_id} is not a text channel"
            ))),
        }
    }

    async fn send_message(
        &self,
        channel_id: &str,
        payload: MessagePayload,
    ) -> Result<ChannelMessage> {
        let http = self.http()?;
        let message = parse_channel_id(channel_id)?
            .send_message(&*http, create_message(payload))
            .await
            .map_err(|e| classify("send message", channel_id, Lookup::Other, e))?;
        Ok(to_channel_message(&message))
    }

    async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<ChannelMessage>> {
        let http = self.http()?;
        let Some(id) = parse_message_id(message_id) else {
            return Ok(None);
        };
        match parse_channel_id(channel_id)?.message(&*http, id).await {
            Ok(message) => Ok(Some(to_channel_message(&message))),
            Err(e) => match classify("fetch message", channel_id, Lookup::Message(message_id), e) {
                Error::MessageNotFound { .. } => Ok(None),
                other => Err(other),
            },
        }
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>> {
        let http = self.http()?;
        let messages = parse_channel_id(channel_id)?
            .messages(&*http, GetMessages::new().limit(limit))
            .await
            .map_err(|e| classify("fetch messages", channel_id, Lookup::Other, e))?;
        Ok(messages.iter().map(to_channel_message).collect())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        let http = self.http()?;
        let id = parse_message_id(message_id).ok_or_else(|| Error::message_not_found(message_id))?;
        parse_channel_id(channel_id)?
            .delete_message(&*http, id)
            .await
            .map_err(|e| classify("delete message", channel_id, Lookup::Message(message_id), e))
    }
}

fn parse_snowflake(raw: &str) -> Option<u64> {
    raw.trim().parse::<u64>().ok().filter(|id| *id != 0)
}

fn parse_channel_id(raw: &str) -> Result<ChannelId> {
    parse_snowflake(raw)
        .map(ChannelId::new)
        .ok_or_else(|| Error::channel_not_found(raw))
}

fn parse_message_id(raw: &str) -> Option<MessageId> {
    parse_snowflake(raw).map(MessageId::new)
}

/// What a failed request was looking up.
#[derive(Clone, Copy)]
enum Lookup<'a> {
    Channel,
    Message(&'a str),
    Other,
}

/// Map a serenity failure onto the engine's error taxonomy.
fn classify(context: &str, channel_id: &str, lookup: Lookup<'_>, err: SerenityError) -> Error {
    if let SerenityError::Http(HttpError::UnsuccessfulRequest(response)) = &err
        && let Some(gone) = gone(
            response.error.code,
            response.status_code.as_u16(),
            channel_id,
            lookup,
        )
    {
        return gone;
    }
    Error::external(context, err)
}

/// Decide whether a Discord error answer means the target no longer exists.
///
/// Only "unknown channel" and "unknown message" (or a bare 404) count as
/// not-found. A channel lookup also treats "missing access" as gone, since
/// the bot can no longer see the channel at all.
fn gone(code: isize, status: u16, channel_id: &str, lookup: Lookup<'_>) -> Option<Error> {
    match (lookup, code) {
        (_, UNKNOWN_CHANNEL) | (Lookup::Channel, MISSING_ACCESS) => {
            Some(Error::channel_not_found(channel_id))
        },
        (Lookup::Message(message_id), UNKNOWN_MESSAGE) => {
            Some(Error::message_not_found(message_id))
        },
        (Lookup::Message(message_id), _) if status == 404 => {
            Some(Error::message_not_found(message_id))
        },
        (Lookup::Channel | Lookup::Other, _) if status == 404 => {
            Some(Error::channel_not_found(channel_id))
        },
        _ => None,
    }
}

fn to_channel_message(message: &Message) -> ChannelMessage {
    ChannelMessage {
        id: message.id.to_string(),
        author_id: message.author.id.to_string(),
        content: message.content.clone(),
        card_footers: message
            .embeds
            .iter()
            .map(|embed| embed.footer.as_ref().map(|footer| footer.text.clone()))
            .collect(),
    }
}

pub(crate) fn create_message(payload: MessagePayload) -> CreateMessage {
    match payload {
        MessagePayload::Text(text) => CreateMessage::new().content(text),
        MessagePayload::Card(card) => CreateMessage::new().embed(create_embed(card)),
    }
}

pub(crate) fn create_embed(card: RichCard) -> CreateEmbed {
    let mut embed = CreateEmbed::new().description(card.description);
    if let Some(rgb) = color_to_rgb(&card.color) {
        embed = embed.colour(Colour::new(rgb));
    }
    if let Some(title) = card.title {
        embed = embed.title(title);
    }
    if let Some(footer) = card.footer {
        embed = embed.footer(CreateEmbedFooter::new(footer));
    }
    if let Some(timestamp) = card
        .timestamp
        .and_then(|ts| Timestamp::from_unix_timestamp(ts.timestamp()).ok())
    {
        embed = embed.timestamp(timestamp);
    }
    for field in card.fields {
        embed = embed.field(field.name, field.value, false);
    }
    embed
}

//! Scriptable in-memory platform for engine tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;

use crate::{
    Error, Result,
    platform::{ChannelInfo, ChannelMessage, MessagePayload, MessagingPlatform},
    registry::StickyRegistry,
    store_memory::InMemoryStore,
    types::StickyConfig,
};

pub const BOT_ID: &str = "bot";
pub const GUILD_ID: &str = "g1";

#[derive(Default)]
struct Inner {
    channels: HashMap<String, ChannelInfo>,
    /// Oldest first.
    history: HashMap<String, Vec<ChannelMessage>>,
    sent: Vec<(String, MessagePayload)>,
    deleted: Vec<String>,
    undeletable: HashSet<String>,
    fail_sends: bool,
    fail_history: bool,
    next_id: u64,
}

#[derive(Default)]
pub struct FakePlatform {
    inner: Mutex<Inner>,
    send_delay: Mutex<Option<Duration>>,
}

impl FakePlatform {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    pub fn add_channel(&self, id: &str, name: &str) {
        self.add_channel_in(id, name, GUILD_ID);
    }

    pub fn add_channel_in(&self, id: &str, name: &str, guild_id: &str) {
        self.inner().channels.insert(id.to_string(), ChannelInfo {
            id: id.to_string(),
            name: name.to_string(),
            guild_id: Some(guild_id.to_string()),
            guild_name: "Test Server".to_string(),
            member_count: 42,
        });
    }

    pub fn remove_channel(&self, id: &str) {
        self.inner().channels.remove(id);
    }

    /// Append a message to a channel's history and return its ID.
    pub fn push_message(&self, channel_id: &str, author_id: &str, content: &str) -> String {
        self.push(channel_id, author_id, content.to_string(), Vec::new())
    }

    pub fn push_card(&self, channel_id: &str, author_id: &str, footer: Option<&str>) -> String {
        self.push(
            channel_id,
            author_id,
            String::new(),
            vec![footer.map(str::to_string)],
        )
    }

    fn push(
        &self,
        channel_id: &str,
        author_id: &str,
        content: String,
        card_footers: Vec<Option<String>>,
    ) -> String {
        let mut inner = self.inner();
        inner.next_id += 1;
        let id = format!("m{}", inner.next_id);
        inner
            .history
            .entry(channel_id.to_string())
            .or_default()
            .push(ChannelMessage {
                id: id.clone(),
                author_id: author_id.to_string(),
                content,
                card_footers,
            });
        id
    }

    pub fn history(&self, channel_id: &str) -> Vec<ChannelMessage> {
        self.inner()
            .history
            .get(channel_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn message_ids(&self, channel_id: &str) -> Vec<String> {
        self.history(channel_id).into_iter().map(|m| m.id).collect()
    }

    pub fn sent(&self) -> Vec<(String, MessagePayload)> {
        self.inner().sent.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.inner().deleted.clone()
    }

    pub fn set_undeletable(&self, message_id: &str) {
        self.inner().undeletable.insert(message_id.to_string());
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.inner().fail_sends = fail;
    }

    pub fn set_fail_history(&self, fail: bool) {
        self.inner().fail_history = fail;
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock().unwrap() = Some(delay);
    }

    fn require_channel(&self, channel_id: &str) -> Result<ChannelInfo> {
        self.inner()
            .channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| Error::channel_not_found(channel_id))
    }
}

#[async_trait]
impl MessagingPlatform for FakePlatform {
    fn self_user_id(&self) -> Option<String> {
        Some(BOT_ID.to_string())
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo> {
        self.require_channel(channel_id)
    }

    async fn send_message(
        &self,
        channel_id: &str,
        payload: MessagePayload,
    ) -> Result<ChannelMessage> {
        self.require_channel(channel_id)?;
        let delay = *self.send_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.inner().fail_sends {
            return Err(Error::external(
                "send message",
                std::io::Error::other("rate limited"),
            ));
        }

        let (content, card_footers) = match &payload {
            MessagePayload::Text(text) => (text.clone(), Vec::new()),
            MessagePayload::Card(card) => (String::new(), vec![card.footer.clone()]),
        };
        let id = self.push(channel_id, BOT_ID, content, card_footers);
        self.inner().sent.push((channel_id.to_string(), payload));
        let message = self
            .history(channel_id)
            .into_iter()
            .find(|m| m.id == id)
            .expect("just pushed");
        Ok(message)
    }

    async fn fetch_message(
        &self,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<ChannelMessage>> {
        self.require_channel(channel_id)?;
        Ok(self
            .history(channel_id)
            .into_iter()
            .find(|m| m.id == message_id))
    }

    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: u8,
    ) -> Result<Vec<ChannelMessage>> {
        self.require_channel(channel_id)?;
        if self.inner().fail_history {
            return Err(Error::external(
                "fetch messages",
                std::io::Error::other("gateway timeout"),
            ));
        }
        Ok(self
            .history(channel_id)
            .into_iter()
            .rev()
            .take(usize::from(limit))
            .collect())
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<()> {
        self.require_channel(channel_id)?;
        let mut inner = self.inner();
        if inner.undeletable.contains(message_id) {
            return Err(Error::external(
                "delete message",
                std::io::Error::other("missing access"),
            ));
        }
        let history = inner.history.entry(channel_id.to_string()).or_default();
        let before = history.len();
        history.retain(|m| m.id != message_id);
        if history.len() == before {
            return Err(Error::message_not_found(message_id));
        }
        inner.deleted.push(message_id.to_string());
        Ok(())
    }
}

/// Registry over an in-memory store seeded with `configs`.
pub async fn registry_with(configs: Vec<StickyConfig>) -> (Arc<InMemoryStore>, Arc<StickyRegistry>) {
    let map = configs
        .into_iter()
        .map(|c| (c.channel_id.clone(), c))
        .collect();
    let store = Arc::new(InMemoryStore::with_configs(map));
    let registry = Arc::new(StickyRegistry::load(store.clone()).await.unwrap());
    (store, registry)
}

//! In-memory sticky map backed by a [`StickyStore`].

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::{
    Result,
    store::{StickyMap, StickyStore},
    types::StickyConfig,
};

/// Owns the live channel → config map and writes full snapshots through
/// the store after each mutation.
///
/// The map lock is a `std::sync::Mutex` and is never held across an
/// `.await`. Snapshot writes are serialized by `write_lock`, so the last
/// write always carries the latest map.
pub struct StickyRegistry {
    configs: Mutex<StickyMap>,
    store: Arc<dyn StickyStore>,
    write_lock: tokio::sync::Mutex<()>,
}

impl StickyRegistry {
    /// Load every config from `store`.
    pub async fn load(store: Arc<dyn StickyStore>) -> Result<Self> {
        let configs = store.load().await?;
        info!(count = configs.len(), "loaded sticky configs");
        Ok(Self {
            configs: Mutex::new(configs),
            store,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    fn map(&self) -> std::sync::MutexGuard<'_, StickyMap> {
        self.configs.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, channel_id: &str) -> Option<StickyConfig> {
        self.map().get(channel_id).cloned()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.map().contains_key(channel_id)
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    /// Configured channel IDs in a stable order.
    pub fn channel_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.map().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// All configs, ordered by channel ID.
    pub fn list(&self) -> Vec<StickyConfig> {
        let mut configs: Vec<StickyConfig> = self.map().values().cloned().collect();
        configs.sort_by(|a, b| a.channel_id.cmp(&b.channel_id));
        configs
    }

    /// Create or overwrite the config for its channel, then persist.
    pub async fn upsert(&self, config: StickyConfig) -> Result<()> {
        self.map().insert(config.channel_id.clone(), config);
        self.persist().await
    }

    /// Drop a channel's config, then persist. Returns the removed config.
    pub async fn remove(&self, channel_id: &str) -> Result<Option<StickyConfig>> {
        let removed = self.evict(channel_id);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Record the ID of a freshly posted sticky message and persist.
    ///
    /// Only updates an existing entry: returns `false` (and writes nothing)
    /// when the config was removed while the post was in flight.
    pub async fn record_post(&self, channel_id: &str, message_id: &str) -> Result<bool> {
        let updated = {
            let mut map = self.map();
            match map.get_mut(channel_id) {
                Some(config) => {
                    config.last_message_id = Some(message_id.to_string());
                    true
                },
                None => false,
            }
        };
        if updated {
            self.persist().await?;
        } else {
            debug!(channel_id, message_id, "config gone before post was recorded");
        }
        Ok(updated)
    }

    /// Forget the tracked message ID and persist. Returns `false` when nothing changed.
    pub async fn clear_last_message(&self, channel_id: &str) -> Result<bool> {
        if !self.forget_last_message(channel_id) {
            return Ok(false);
        }
        self.persist().await?;
        Ok(true)
    }

    /// Drop a config without persisting. Used by batch passes that persist once at the end.
    pub fn evict(&self, channel_id: &str) -> Option<StickyConfig> {
        self.map().remove(channel_id)
    }

    /// Forget the tracked message ID without persisting.
    pub fn forget_last_message(&self, channel_id: &str) -> bool {
        self.map()
            .get_mut(channel_id)
            .and_then(|config| config.last_message_id.take())
            .is_some()
    }

    /// Write the current map to the store.
    pub async fn persist(&self) -> Result<()> {
        let _write = self.write_lock.lock().await;
        let snapshot = self.map().clone();
        self.store.save(&snapshot).await
    }
}

//! Persistence trait for sticky configs.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::{Result, types::StickyConfig};

/// Channel ID → config, as persisted.
pub type StickyMap = HashMap<String, StickyConfig>;

/// Durable snapshot of every sticky config.
///
/// Writes are full-snapshot overwrites, never incremental.
#[async_trait]
pub trait StickyStore: Send + Sync {
    /// Load the whole map. A missing backing file is an empty map.
    async fn load(&self) -> Result<StickyMap>;
    async fn save(&self, configs: &StickyMap) -> Result<()>;
}

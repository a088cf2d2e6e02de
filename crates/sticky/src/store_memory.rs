//! In-memory store for testing.

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;

use crate::{
    Result,
    store::{StickyMap, StickyStore},
};

/// In-memory store. No persistence; counts saves so tests can assert on them.
#[derive(Default)]
pub struct InMemoryStore {
    configs: Mutex<StickyMap>,
    saves: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store as if a previous process had saved `configs`.
    pub fn with_configs(configs: StickyMap) -> Self {
        Self {
            configs: Mutex::new(configs),
            saves: AtomicUsize::new(0),
        }
    }

    /// Last saved snapshot.
    pub fn snapshot(&self) -> StickyMap {
        self.configs
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StickyStore for InMemoryStore {
    async fn load(&self) -> Result<StickyMap> {
        Ok(self.snapshot())
    }

    async fn save(&self, configs: &StickyMap) -> Result<()> {
        *self.configs.lock().unwrap_or_else(|e| e.into_inner()) = configs.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

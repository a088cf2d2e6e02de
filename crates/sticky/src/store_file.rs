//! JSON file-backed sticky store with atomic writes.

use std::path::{Path, PathBuf};

use {async_trait::async_trait, tokio::fs, tracing::debug};

use crate::{
    Result,
    store::{StickyMap, StickyStore},
};

/// File-backed store. One JSON object mapping channel IDs to configs.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomic write: write to temp, rename over target, keep `.bak`.
    async fn atomic_write(&self, json: &str) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json.as_bytes()).await?;

        if fs::try_exists(&self.path).await.unwrap_or(false) {
            let bak = self.path.with_extension("json.bak");
            let _ = fs::rename(&self.path, &bak).await;
        }

        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StickyStore for FileStore {
    async fn load(&self) -> Result<StickyMap> {
        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(StickyMap::new());
        }
        let data = fs::read_to_string(&self.path).await?;
        if data.trim().is_empty() {
            return Ok(StickyMap::new());
        }
        let configs: StickyMap = serde_json::from_str(&data)?;
        Ok(configs)
    }

    async fn save(&self, configs: &StickyMap) -> Result<()> {
        let json = serde_json::to_string_pretty(configs)?;
        self.atomic_write(&json).await?;
        debug!(path = %self.path.display(), count = configs.len(), "saved sticky configs");
        Ok(())
    }
}

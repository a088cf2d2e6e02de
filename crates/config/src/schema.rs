//! Config schema for the sticky bot process.

use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StickyBotConfig {
    pub discord: DiscordConfig,
    pub storage: StorageConfig,
    pub timing: TimingConfig,
    pub scan: ScanConfig,
}

/// Discord connection settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscordConfig {
    /// Bot token from the Discord developer portal.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
}

impl DiscordConfig {
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }
}

impl std::fmt::Debug for DiscordConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscordConfig")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

/// Where sticky state is persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot path. Falls back to `<data_dir>/sticky-data.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_file: Option<PathBuf>,
}

/// Delays that pace the re-post cycle. All values in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimingConfig {
    /// Quiet period after the last activity before a re-post fires.
    pub debounce_ms: u64,
    /// Upper bound on how long continuous activity may postpone a re-post.
    /// Absent means no bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debounce_max_wait_ms: Option<u64>,
    /// Pause between clearing old posts and sending the new one.
    pub settle_ms: u64,
    /// Spacing between deletions during a steady-state refresh.
    pub refresh_delete_spacing_ms: u64,
    /// Spacing between deletions during the startup sweep.
    pub startup_delete_spacing_ms: u64,
    /// Wait after connecting before the startup sweep.
    pub startup_grace_ms: u64,
    /// Wait between the startup sweep and the refresh-all pass.
    pub post_sweep_grace_ms: u64,
    /// Spacing between channels in the refresh-all pass.
    pub channel_spacing_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 2_000,
            debounce_max_wait_ms: None,
            settle_ms: 500,
            refresh_delete_spacing_ms: 100,
            startup_delete_spacing_ms: 150,
            startup_grace_ms: 5_000,
            post_sweep_grace_ms: 3_000,
            channel_spacing_ms: 1_000,
        }
    }
}

/// How many recent messages each cleanup pass inspects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScanConfig {
    pub refresh_limit: u8,
    pub startup_limit: u8,
    pub force_cleanup_limit: u8,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            refresh_limit: 50,
            startup_limit: 100,
            force_cleanup_limit: 100,
        }
    }
}

//! Configuration loading and env substitution for the sticky bot.
//!
//! Config files: `stickybot.toml`, `stickybot.yaml`, or `stickybot.json`
//! Searched in `./` then `~/.config/stickybot/`.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        apply_env_overrides, config_dir, data_dir, default_data_file, discover_and_load,
        load_config,
    },
    schema::{DiscordConfig, ScanConfig, StickyBotConfig, StorageConfig, TimingConfig},
};

use std::path::{Path, PathBuf};

use {
    secrecy::Secret,
    tracing::{debug, warn},
};

use crate::{env_subst::substitute_env, schema::StickyBotConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "stickybot.toml",
    "stickybot.yaml",
    "stickybot.yml",
    "stickybot.json",
];

/// File name of the persisted sticky snapshot inside the data dir.
const DATA_FILENAME: &str = "sticky-data.json";

/// Env vars consulted for the bot token, highest priority first.
const TOKEN_ENV_VARS: &[&str] = &["STICKYBOT_DISCORD_TOKEN", "DISCORD_TOKEN"];

const DATA_FILE_ENV_VAR: &str = "STICKYBOT_DATA_FILE";

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<StickyBotConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Load config from `explicit` when given, otherwise from standard locations.
///
/// Search order:
/// 1. `./stickybot.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/stickybot/stickybot.{toml,yaml,yml,json}` (user-global)
///
/// Returns `StickyBotConfig::default()` if no config file is found. An
/// explicit path that fails to load is an error rather than a silent default.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<StickyBotConfig> {
    if let Some(path) = explicit {
        debug!(path = %path.display(), "loading config");
        return load_config(path);
    }

    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return Ok(cfg),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    Ok(StickyBotConfig::default())
}

/// Apply environment overrides (token, data file) on top of a loaded config.
pub fn apply_env_overrides(config: &mut StickyBotConfig) {
    apply_env_overrides_with(config, |name| std::env::var(name).ok());
}

fn apply_env_overrides_with(config: &mut StickyBotConfig, lookup: impl Fn(&str) -> Option<String>) {
    let token = TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|value| !value.trim().is_empty());
    if let Some(token) = token {
        config.discord.token = Secret::new(token);
    }

    if let Some(path) = lookup(DATA_FILE_ENV_VAR).filter(|p| !p.trim().is_empty()) {
        config.storage.data_file = Some(PathBuf::from(path));
    }
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/stickybot/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stickybot").map(|d| d.config_dir().to_path_buf())
}

/// Returns the user data directory (`~/.local/share/stickybot/` on Linux).
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stickybot").map(|d| d.data_dir().to_path_buf())
}

/// Resolve the sticky snapshot path: config value, else the data dir, else `./`.
pub fn default_data_file(config: &StickyBotConfig) -> PathBuf {
    if let Some(path) = &config.storage.data_file {
        return path.clone();
    }
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DATA_FILENAME)
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<StickyBotConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

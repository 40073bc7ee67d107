use super::address::Address;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_FEED_URL: &str = "https://api.tokenmetrics.com/v2";
pub const DEFAULT_INTERVAL_MS: u64 = 3_600_000;
pub const DEFAULT_SYMBOLS: &[&str] = &["BTC", "ETH", "SOL", "DOGE", "AVAX"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting `{key}` (env {env})")]
    Missing { key: &'static str, env: &'static str },

    #[error("invalid value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FeedConfig {
    #[serde(default = "default_feed_url")]
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub retries: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        FeedConfig {
            base_url: default_feed_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
            retries: 0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StoreConfig {
    pub path: Option<String>,
    pub owner: Option<String>,
    pub keeper: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct StakeConfig {
    pub base_url: Option<String>,
    /// Reads need a balance strictly above this value.
    #[serde(default)]
    pub threshold: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeeperConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        KeeperConfig {
            interval_ms: default_interval_ms(),
            symbols: default_symbols(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub stake: StakeConfig,
    #[serde(default)]
    pub keeper: KeeperConfig,
}

/// Store location and role identities, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub path: PathBuf,
    pub owner: Address,
}

/// Everything the keeper process needs, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeeperSettings {
    pub feed_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub retries: usize,
    pub store: StoreSettings,
    pub keeper: Address,
    pub symbols: Vec<String>,
    pub interval: Duration,
}

impl AppConfig {
    /// Loads `path`, or the default config file when present, then applies
    /// environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => {
                let default_path = Self::default_config_path()?;
                if default_path.exists() {
                    Self::load_from_path(&default_path)?
                } else {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "tokenmetrics", "rating-oracle")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Overrides file values with whatever `lookup` returns for the known
    /// environment keys.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TM_API_BASE_URL") {
            self.feed.base_url = v;
        }
        if let Some(v) = get("TM_API_KEY") {
            self.feed.api_key = Some(v);
        }
        if let Some(v) = get("ORACLE_STORE_PATH") {
            self.store.path = Some(v);
        }
        if let Some(v) = get("ORACLE_OWNER") {
            self.store.owner = Some(v);
        }
        if let Some(v) = get("ORACLE_KEEPER") {
            self.store.keeper = Some(v);
        }
        if let Some(v) = get("STAKE_API_URL") {
            self.stake.base_url = Some(v);
        }
        if let Some(v) = get("STAKE_THRESHOLD") {
            self.stake.threshold = v.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "stake.threshold",
                reason: format!("{e}: {v}"),
            })?;
        }
        if let Some(v) = get("UPDATE_INTERVAL") {
            self.keeper.interval_ms = v.trim().parse().map_err(|e| ConfigError::Invalid {
                key: "keeper.interval_ms",
                reason: format!("{e}: {v}"),
            })?;
        }
        if let Some(v) = get("SYMBOLS") {
            self.keeper.symbols = v.split(',').map(str::to_string).collect();
        }
        Ok(())
    }

    pub fn store_settings(&self) -> Result<StoreSettings, ConfigError> {
        let path = required(&self.store.path, "store.path", "ORACLE_STORE_PATH")?;
        let owner = parse_address(&self.store.owner, "store.owner", "ORACLE_OWNER")?;
        Ok(StoreSettings {
            path: PathBuf::from(path),
            owner,
        })
    }

    /// Timeout applied to feed and stake HTTP requests.
    pub fn request_timeout(&self) -> Result<Duration, ConfigError> {
        if self.feed.timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "feed.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Duration::from_millis(self.feed.timeout_ms))
    }

    pub fn keeper_settings(&self) -> Result<KeeperSettings, ConfigError> {
        let api_key = required(&self.feed.api_key, "feed.api_key", "TM_API_KEY")?;
        let store = self.store_settings()?;
        let keeper = parse_address(&self.store.keeper, "store.keeper", "ORACLE_KEEPER")?;

        if self.keeper.interval_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "keeper.interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        let timeout = self.request_timeout()?;
        let symbols = normalize_symbols(&self.keeper.symbols);
        if symbols.is_empty() {
            return Err(ConfigError::Invalid {
                key: "keeper.symbols",
                reason: "no symbols configured".to_string(),
            });
        }

        Ok(KeeperSettings {
            feed_url: self.feed.base_url.clone(),
            api_key: api_key.to_string(),
            timeout,
            retries: self.feed.retries,
            store,
            keeper,
            symbols,
            interval: Duration::from_millis(self.keeper.interval_ms),
        })
    }
}

/// Trims symbols, drops empty entries and keeps the first of any duplicates.
pub fn normalize_symbols(symbols: &[String]) -> Vec<String> {
    let mut normalized: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if normalized.iter().any(|s| s == symbol) {
            debug!(symbol, "Ignoring duplicate symbol");
            continue;
        }
        normalized.push(symbol.to_string());
    }
    normalized
}

fn required<'a>(
    value: &'a Option<String>,
    key: &'static str,
    env: &'static str,
) -> Result<&'a str, ConfigError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { key, env })
}

fn parse_address(
    value: &Option<String>,
    key: &'static str,
    env: &'static str,
) -> Result<Address, ConfigError> {
    required(value, key, env)?
        .parse()
        .map_err(|e: anyhow::Error| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}

fn default_feed_url() -> String {
    DEFAULT_FEED_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/lwatch.sqlite"
//!
//! [source]
//! url = "https://mazda-vidi.com.ua/ua/used-cars/"
//! base_url = "https://mazda-vidi.com.ua"
//!
//! [filter]
//! min_year = 2020
//! models = ["CX-5", "CX-30"]
//!
//! [schedule]
//! poll_interval_ms = 14400000
//!
//! [telegram]
//! token_env = "LWATCH_BOT_TOKEN"
//!
//! [server]
//! bind = "0.0.0.0:3000"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use listing_watch_core::extract::ListingFilter;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub source: SourceConfig,
    pub filter: FilterConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub server: Option<ServerConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    /// Listing page fetched every cycle.
    pub url: String,
    /// Origin prepended to relative detail links. Derived from `url` when unset.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl SourceConfig {
    pub fn resolved_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| origin_of(&self.url).to_string())
    }
}

/// `scheme://host[:port]` part of a URL, or the whole string if it has no path.
fn origin_of(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(i) => &url[..after_scheme + i],
        None => url,
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilterConfig {
    pub min_year: u32,
    pub models: Vec<String>,
}

impl FilterConfig {
    pub fn to_filter(&self) -> ListingFilter {
        ListingFilter {
            min_year: self.min_year,
            models: self.models.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_poll_interval_ms() -> u64 {
    4 * 60 * 60 * 1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    concat!("listing-watch/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    /// Environment variable holding the bot token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
    /// Long-poll duration passed to `getUpdates`.
    #[serde(default = "default_poll_timeout_secs")]
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            api_base: default_api_base(),
            send_timeout_secs: default_send_timeout_secs(),
            poll_timeout_secs: default_poll_timeout_secs(),
        }
    }
}

impl TelegramConfig {
    pub fn token(&self) -> Result<String> {
        std::env::var(&self.token_env)
            .with_context(|| format!("{} environment variable not set", self.token_env))
    }
}

fn default_token_env() -> String {
    "LWATCH_BOT_TOKEN".to_string()
}
fn default_api_base() -> String {
    "https://api.telegram.org".to_string()
}
fn default_send_timeout_secs() -> u64 {
    15
}
fn default_poll_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Upper bound the Bot API accepts for a `getUpdates` long poll.
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;

    if !(config.source.url.starts_with("http://") || config.source.url.starts_with("https://")) {
        anyhow::bail!("source.url must be an http(s) URL, got '{}'", config.source.url);
    }

    if config.filter.min_year == 0 {
        anyhow::bail!("filter.min_year must be > 0");
    }
    if config.filter.models.is_empty() {
        anyhow::bail!("filter.models must list at least one model substring");
    }
    if config.filter.models.iter().any(|m| m.trim().is_empty()) {
        anyhow::bail!("filter.models must not contain empty strings");
    }

    if config.schedule.poll_interval_ms < 1000 {
        anyhow::bail!("schedule.poll_interval_ms must be >= 1000");
    }

    if config.http.fetch_timeout_secs == 0 {
        anyhow::bail!("http.fetch_timeout_secs must be > 0");
    }
    if config.telegram.send_timeout_secs == 0 {
        anyhow::bail!("telegram.send_timeout_secs must be > 0");
    }
    if config.telegram.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
        anyhow::bail!(
            "telegram.poll_timeout_secs must be <= {}, got {}",
            MAX_POLL_TIMEOUT_SECS,
            config.telegram.poll_timeout_secs
        );
    }

    Ok(config)
}

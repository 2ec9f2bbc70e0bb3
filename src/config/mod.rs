use crate::api::Timeouts;
use anyhow::Context;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_SCRAPE_LIMIT: u32 = 100;

/// Environment variable overriding `base_url`.
pub const BASE_URL_ENV: &str = "CHATBOT_API_BASE";

static GLOBAL: OnceCell<Config> = OnceCell::new();

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend root, e.g. `http://telegram-bot:8000` on a docker network.
    pub base_url: String,

    /// Whole-request timeout in seconds for JSON calls. 0 disables it.
    pub timeout_secs: u64,

    /// Longest silence in seconds before a read fails, streamed answers included.
    /// 0 disables it.
    pub read_timeout_secs: u64,

    pub connect_timeout_secs: u64,

    /// Messages fetched per scrape when no limit is given.
    pub scrape_limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
            read_timeout_secs: 120,
            connect_timeout_secs: 10,
            scrape_limit: DEFAULT_SCRAPE_LIMIT,
        }
    }
}

impl Config {
    /// Default config file location.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("chatbot-client").join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".chatbot-client/config.toml"))
    }

    /// Load config from the default path, then apply the environment.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from `path` (defaults if it does not exist), then apply the environment.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            Config::default()
        };

        config.apply_env_value(std::env::var(BASE_URL_ENV).ok());
        Ok(config)
    }

    fn apply_env_value(&mut self, base_url: Option<String>) {
        if let Some(url) = base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            request: secs(self.timeout_secs),
            read: secs(self.read_timeout_secs),
            connect: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

/// Install the process-wide config. Only the first call has an effect.
///
/// Returns `false` if a config was already installed.
pub fn init(config: Config) -> bool {
    GLOBAL.set(config).is_ok()
}

/// Process-wide config, or the defaults if [`init`] was never called.
pub fn get() -> &'static Config {
    GLOBAL.get_or_init(Config::default)
}

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, ScrapeError};

/// Default browser-like User-Agent sent with every page request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Allowed range for the politeness delay between batch fetches (seconds)
pub const MIN_DELAY_SECS: u64 = 1;
pub const MAX_DELAY_SECS: u64 = 3;

/// Global suppscore configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Page fetch deadline in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Pause between successive fetches in batch mode
    #[serde(default = "default_delay")]
    pub delay_secs: u64,

    /// User-Agent header for page requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accept-Language header for page requests
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
}

fn default_timeout() -> u64 {
    20
}

fn default_delay() -> u64 {
    3
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_accept_language() -> String {
    "en-US,en;q=0.9".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            delay_secs: default_delay(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| ScrapeError::ConfigError(e.to_string()))?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Supports SUPPSCORE_CONFIG environment variable for test isolation
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var("SUPPSCORE_CONFIG") {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("", "", "suppscore")
            .ok_or_else(|| ScrapeError::ConfigError("Could not determine config directory".into()))?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Reject settings that would hammer retailers or never finish
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ScrapeError::ConfigError("timeout_secs must be at least 1".into()));
        }
        check_delay(self.delay_secs)?;
        if self.user_agent.trim().is_empty() {
            return Err(ScrapeError::ConfigError("user_agent must not be empty".into()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

/// Politeness delay must stay within 1-3 seconds
pub fn check_delay(secs: u64) -> Result<u64> {
    if !(MIN_DELAY_SECS..=MAX_DELAY_SECS).contains(&secs) {
        return Err(ScrapeError::ConfigError(format!(
            "Delay {}s is out of range. Use {}-{} seconds between requests.",
            secs, MIN_DELAY_SECS, MAX_DELAY_SECS
        )));
    }
    Ok(secs)
}

//! Configuration management module.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::models::auth::Session;
use crate::punctuality::Zone;

/// Configuration load result.
#[derive(Debug)]
pub enum ConfigLoadResult {
    /// Config loaded successfully.
    Loaded(AppConfig),
    /// Config file missing (first run).
    Missing,
    /// Config file exists but invalid.
    Invalid(ConfigError),
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// REST API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout in seconds (default: 30).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Sent as `X-Device-ID` on sign-in and token refresh.
    #[serde(default = "default_device_id")]
    pub device_id: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_device_id() -> String {
    "attendance-dashboard-cli".to_string()
}

fn default_history_limit() -> u32 {
    4
}

/// How records are presented and evaluated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Minutes east of UTC for punctuality evaluation; host local zone when unset.
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
    /// Records fetched for the employee dashboard (default: 4).
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
}

impl AppConfig {
    /// Get config file path (same directory as executable).
    pub fn default_path() -> PathBuf {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }

    /// Attempt to load config with detailed result.
    pub fn try_load(path: &Path) -> ConfigLoadResult {
        if !path.exists() {
            return ConfigLoadResult::Missing;
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<AppConfig>(&content) {
                Ok(config) => match config.validate() {
                    Ok(()) => ConfigLoadResult::Loaded(config),
                    Err(e) => ConfigLoadResult::Invalid(e),
                },
                Err(e) => ConfigLoadResult::Invalid(ConfigError::Parse(e)),
            },
            Err(e) => ConfigLoadResult::Invalid(ConfigError::Read(e)),
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConfigError::Validation("API base URL cannot be empty".to_string()));
        }
        if !self.api.base_url.starts_with("http") {
            return Err(ConfigError::Validation(
                "API base URL must start with http:// or https://".to_string(),
            ));
        }
        if self.api.timeout_secs < 5 {
            return Err(ConfigError::Validation(
                "API timeout must be at least 5 seconds".to_string(),
            ));
        }
        if self.api.device_id.trim().is_empty() {
            return Err(ConfigError::Validation("Device ID cannot be empty".to_string()));
        }
        if let Some(minutes) = self.display.utc_offset_minutes {
            if minutes.abs() > 14 * 60 {
                return Err(ConfigError::Validation(
                    "UTC offset must be within +/-14 hours".to_string(),
                ));
            }
        }
        if !(1..=100).contains(&self.display.history_limit) {
            return Err(ConfigError::Validation(
                "History limit must be between 1 and 100".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Zone punctuality is evaluated in.
    pub fn zone(&self) -> Zone {
        self.display
            .utc_offset_minutes
            .and_then(Zone::from_offset_minutes)
            .unwrap_or_default()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api/v1".to_string(),
            timeout_secs: default_timeout_secs(),
            device_id: default_device_id(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            utc_offset_minutes: None,
            history_limit: default_history_limit(),
        }
    }
}

/// Stored sign-in session, kept next to the config file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `session.toml` in the directory of `config_path`.
    pub fn beside(config_path: &Path) -> Self {
        let dir = config_path.parent().unwrap_or_else(|| Path::new("."));
        Self::new(dir.join("session.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored session; `Ok(None)` when nobody is signed in.
    pub fn load(&self) -> Result<Option<Session>, ConfigError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let session: Session = toml::from_str(&content)?;
        if session.access_token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(session))
    }

    pub fn save(&self, session: &Session) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<(), ConfigError> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

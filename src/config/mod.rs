//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::fetch::{FetcherConfig, DEFAULT_BASE_URL};
use crate::models::Tier;
use crate::parse_duration;
use crate::storage::StorageConfig;
use crate::sync::{SyncConfig, DEFAULT_COLLECTION};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Upstream statistics API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Absolute http(s) URL ending in `/`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("hero-meta/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Batch sync job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Interval for `sync --watch`, e.g. "6h"
    #[serde(default = "default_interval")]
    pub interval: String,
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

fn default_interval() -> String {
    "6h".to_string()
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            interval: default_interval(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Search dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DashboardConfig {
    #[serde(default)]
    pub default_tier: Tier,

    /// Hero directory file; `<data_dir>/heroes.json` when unset
    #[serde(default)]
    pub heroes_file: Option<PathBuf>,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub dashboard: DashboardConfig,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            upstream: UpstreamConfig::default(),
            sync: SyncSection::default(),
            server: ServerConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Upstream timeout must be greater than 0".to_string(),
            ));
        }

        self.base_url()?;

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.sync.collection.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Sync collection must not be empty".to_string(),
            ));
        }

        self.sync_interval()?;

        Ok(())
    }

    /// Parsed upstream base URL.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.upstream.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid upstream base URL '{}': {}",
                self.upstream.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "Upstream base URL must be http(s): {}",
                url
            )));
        }
        if !url.path().ends_with('/') {
            return Err(ConfigError::ValidationError(format!(
                "Upstream base URL must end with '/': {}",
                url
            )));
        }
        Ok(url)
    }

    pub fn sync_interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.sync.interval).ok_or_else(|| {
            ConfigError::ValidationError(format!("Invalid sync interval: {}", self.sync.interval))
        })
    }

    pub fn fetcher_config(&self) -> Result<FetcherConfig, ConfigError> {
        Ok(FetcherConfig {
            base_url: self.base_url()?.to_string(),
            timeout: Duration::from_secs(self.upstream.timeout_seconds),
            user_agent: self.upstream.user_agent.clone(),
            ..Default::default()
        })
    }

    pub fn sync_config(&self) -> Result<SyncConfig, ConfigError> {
        Ok(SyncConfig {
            collection: self.sync.collection.clone(),
            interval: self.sync_interval()?,
        })
    }

    pub fn storage(&self) -> StorageConfig {
        StorageConfig::new(self.data_dir.clone())
    }

    /// Hero directory file.
    pub fn heroes_path(&self) -> PathBuf {
        self.dashboard
            .heroes_file
            .clone()
            .unwrap_or_else(|| self.storage().heroes_path())
    }
}

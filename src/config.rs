//! Configuration loading and management
//!
//! Handles parsing of `.tracker.toml` configuration files.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = ".tracker.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot file settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// View history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

/// Snapshot file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the snapshot file
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// How long to wait for the file lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_data_file() -> PathBuf {
    PathBuf::from("tasks.csv")
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// View history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Maximum number of remembered views
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            limit: default_history_limit(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `.tracker.toml` from `dir`, or return defaults if it is missing
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE);
        if config_path.exists() {
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load an explicitly named file, or fall back to the working directory
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path).map_err(|err| match err {
                Error::Io(io) => Error::InvalidConfig(format!("{}: {io}", path.display())),
                other => other,
            }),
            None => {
                let cwd = std::env::current_dir()?;
                Self::load_from_dir(&cwd)
            }
        }
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Parsed `server.bind`
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server.bind.trim().parse().map_err(|_| {
            Error::InvalidConfig(format!(
                "server.bind: invalid socket address '{}'",
                self.server.bind
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.data_file.as_os_str().is_empty() {
            return Err(Error::InvalidConfig(
                "storage.data_file cannot be empty".to_string(),
            ));
        }
        if self.history.limit < 1 {
            return Err(Error::InvalidConfig(
                "history.limit must be >= 1".to_string(),
            ));
        }
        self.bind_addr()?;
        Ok(())
    }
}

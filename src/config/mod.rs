//! Configuration management for offcache

pub mod schema;

pub use schema::Config;

use crate::error::{OffcacheError, OffcacheResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offcache")
            .join("config.toml")
    }

    /// Get the state directory path
    pub fn state_dir() -> PathBuf {
        dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("offcache")
    }

    /// Default root for persisted stores
    pub fn stores_dir() -> PathBuf {
        Self::state_dir().join("stores")
    }

    /// Path of the persisted worker registration
    pub fn registration_path() -> PathBuf {
        Self::state_dir().join("registration.json")
    }

    /// Get the event journal path
    pub fn journal_path() -> PathBuf {
        Self::state_dir().join("events.log")
    }

    /// Store root for a config, honoring `storage.root`
    pub fn stores_root(config: &Config) -> PathBuf {
        config
            .storage
            .root
            .clone()
            .unwrap_or_else(Self::stores_dir)
    }

    /// Registration path for a config. A custom store root keeps its
    /// registration next to it so separate roots never share lifecycle state.
    pub fn registration_path_for(config: &Config) -> PathBuf {
        match &config.storage.root {
            Some(root) => root.join("registration.json"),
            None => Self::registration_path(),
        }
    }

    /// Journal path for a config, following a custom store root like
    /// `registration_path_for`
    pub fn journal_path_for(config: &Config) -> PathBuf {
        match &config.storage.root {
            Some(root) => root.join("events.log"),
            None => Self::journal_path(),
        }
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> OffcacheResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration, failing if the file does not exist
    pub async fn load_required(&self) -> OffcacheResult<Config> {
        if !self.config_path.exists() {
            return Err(OffcacheError::ConfigNotFound(self.config_path.clone()));
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> OffcacheResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| OffcacheError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| OffcacheError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> OffcacheResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            OffcacheError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> OffcacheResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| OffcacheError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration schema for offcache
//!
//! Configuration is stored at `~/.config/offcache/config.toml`

use crate::message::DEFAULT_FALLBACK_BODY;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Worker identity and seed resources
    pub worker: WorkerConfig,

    /// Where stores are persisted
    pub storage: StorageConfig,

    /// Offline fallback page
    pub fallback: FallbackConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record lifecycle and cache events in the journal
    pub journal: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            journal: true,
        }
    }
}

/// Worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Absolute URL the worker controls; relative paths resolve against it
    pub scope: String,

    /// Name of the current store. Changing it makes every other store stale.
    pub store_version: String,

    /// Paths fetched and stored during install
    pub seed_resources: Vec<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            scope: "http://localhost:8080/".to_string(),
            store_version: "pwa-offline-demo-v1".to_string(),
            seed_resources: vec!["/".to_string(), "/index.html".to_string()],
        }
    }
}

/// Storage settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Store root directory (default: `<state_dir>/stores`)
    pub root: Option<PathBuf>,
}

/// Fallback page settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// HTML served when neither cache nor network can answer
    pub body: String,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            body: DEFAULT_FALLBACK_BODY.to_string(),
        }
    }
}

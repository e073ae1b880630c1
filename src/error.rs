//! Error types for offcache
//!
//! All modules use `OffcacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for offcache operations
pub type OffcacheResult<T> = Result<T, OffcacheError>;

/// All errors that can occur in offcache
#[derive(Error, Debug)]
pub enum OffcacheError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Request errors
    #[error("Unsupported request method: {0}")]
    InvalidMethod(String),

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header '{0}'. Expected format: Name: value")]
    InvalidHeader(String),

    // Network errors
    #[error("Network request to {url} failed: {reason}")]
    Network { url: String, reason: String },

    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    #[error("Seed resource {url} returned status {status}")]
    SeedStatus { url: String, status: u16 },

    // Store errors
    #[error("Failed to open store {name}: {reason}")]
    StoreOpen { name: String, reason: String },

    #[error("Store not found: {0}")]
    StoreNotFound(String),

    #[error("Store {store} rejected entry {key}: {reason}")]
    StoreRejected {
        store: String,
        key: String,
        reason: String,
    },

    #[error("Corrupt store entry {path}: {reason}")]
    StoreCorrupt { path: PathBuf, reason: String },

    // Lifecycle errors
    #[error("No worker is waiting to activate")]
    NoWaitingWorker,

    #[error("Worker {id} is waiting for the active worker to release its clients")]
    ActivationBlocked { id: String },

    #[error("Lifecycle hook failed: {0}")]
    Hook(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl OffcacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a network error for a URL
    pub fn network(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create a store-rejected error
    pub fn rejected(
        store: impl Into<String>,
        key: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::StoreRejected {
            store: store.into(),
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. } | Self::NetworkUnavailable(_) | Self::SeedStatus { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::ConfigNotFound(_) => Some("Run: offcache config init"),
            Self::NoWaitingWorker => Some("Run: offcache install"),
            Self::ActivationBlocked { .. } => Some("Run: offcache activate --force"),
            Self::NetworkUnavailable(_) | Self::Network { .. } => {
                Some("Check that worker.scope points at a reachable origin")
            }
            Self::SeedStatus { .. } => Some("Every entry in worker.seed_resources must return 2xx"),
            _ => None,
        }
    }
}

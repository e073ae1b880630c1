//! Worker lifecycle states and host control hooks

use crate::error::OffcacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one worker instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Created, no lifecycle event handled yet
    Parsed,
    /// Install phase running
    Installing,
    /// Install succeeded, waiting to activate
    Installed,
    /// Activate phase running
    Activating,
    /// Serving fetches for its scope
    Activated,
    /// Failed to install or superseded by a newer instance
    Redundant,
}

impl WorkerState {
    /// Only an activated worker intercepts fetches
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, Self::Activated)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Redundant)
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        write!(f, "{}", name)
    }
}

/// Control the host grants a worker over its own lifecycle
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Supersede the current active worker as soon as install completes,
    /// instead of waiting for its clients to close
    async fn skip_waiting(&self) -> OffcacheResult<()>;

    /// Take over already-open clients without requiring a reload
    async fn claim_clients(&self) -> OffcacheResult<()>;
}

//! Host-side worker registration
//!
//! Tracks which worker instance is installing, waiting and active for a
//! scope, and persists that record as JSON so lifecycle state survives
//! between CLI invocations. The registration is also what a worker's
//! `LifecycleHooks` act on.
//!
//! # Transitions
//!
//! | Step | installing | waiting | active |
//! |------|------------|---------|--------|
//! | `begin_install` | new record | - | - |
//! | `finish_install(ok)` | cleared | new record (replaces older waiting) | - |
//! | `finish_install(err)` | cleared | - | untouched |
//! | `begin_activate` | - | marked activating | - |
//! | `finish_activate(ok)` | - | cleared | waiting record (old active dropped) |

use crate::error::{OffcacheError, OffcacheResult};
use crate::worker::controller::{ActivateReport, InstallReport, OfflineCacheController};
use crate::worker::state::{LifecycleHooks, WorkerState};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

/// One worker instance as seen by the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerRecord {
    /// Unique instance ID
    pub id: Uuid,

    /// Store version this instance serves from
    pub store_version: String,

    /// Current lifecycle state
    pub state: WorkerState,

    /// Whether the instance asked to supersede the active worker immediately
    pub skip_waiting: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkerRecord {
    fn new(store_version: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            store_version: store_version.to_string(),
            state: WorkerState::Installing,
            skip_waiting: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn transition(&mut self, state: WorkerState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

/// Persisted registration record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationState {
    pub installing: Option<WorkerRecord>,
    pub waiting: Option<WorkerRecord>,
    pub active: Option<WorkerRecord>,

    /// Instance that most recently claimed open clients
    pub clients_claimed_by: Option<Uuid>,
}

impl RegistrationState {
    /// Mutable record for `id`, whichever slot it is in
    fn record_mut(&mut self, id: Uuid) -> Option<&mut WorkerRecord> {
        [&mut self.installing, &mut self.waiting, &mut self.active]
            .into_iter()
            .filter_map(|slot| slot.as_mut())
            .find(|record| record.id == id)
    }
}

/// Registration for one scope, persisted at `path`
pub struct Registration {
    path: PathBuf,
    state: Mutex<RegistrationState>,
}

impl Registration {
    /// Load the registration at `path`, starting empty if the file is absent
    pub async fn load(path: impl Into<PathBuf>) -> OffcacheResult<Arc<Self>> {
        let path = path.into();
        let state = if path.exists() {
            let content = fs::read_to_string(&path).await.map_err(|e| {
                OffcacheError::io(format!("reading registration {}", path.display()), e)
            })?;
            serde_json::from_str(&content)?
        } else {
            debug!("No registration at {}, starting fresh", path.display());
            RegistrationState::default()
        };

        Ok(Arc::new(Self {
            path,
            state: Mutex::new(state),
        }))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current record
    pub async fn snapshot(&self) -> RegistrationState {
        self.state.lock().await.clone()
    }

    /// The worker currently serving fetches, if any
    pub async fn active(&self) -> Option<WorkerRecord> {
        self.state.lock().await.active.clone()
    }

    /// Hooks bound to instance `id`
    pub fn hooks_for(self: &Arc<Self>, id: Uuid) -> Arc<dyn LifecycleHooks> {
        Arc::new(RegistrationHooks {
            registration: Arc::clone(self),
            id,
        })
    }

    async fn save(&self, state: &RegistrationState) -> OffcacheResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| OffcacheError::io("creating registration directory", e))?;
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content).await.map_err(|e| {
            OffcacheError::io(format!("writing registration {}", self.path.display()), e)
        })
    }

    /// Record a new instance for `store_version` as installing
    pub async fn begin_install(&self, store_version: &str) -> OffcacheResult<WorkerRecord> {
        let mut state = self.state.lock().await;
        let record = WorkerRecord::new(store_version);
        state.installing = Some(record.clone());
        self.save(&state).await?;

        debug!("Installing worker {} for {}", record.id, store_version);
        Ok(record)
    }

    /// Settle an install: success makes the instance the waiting worker,
    /// failure discards it and keeps the active worker as is
    pub async fn finish_install(&self, id: Uuid, success: bool) -> OffcacheResult<()> {
        let mut state = self.state.lock().await;
        let mut record = match state.installing.take() {
            Some(record) if record.id == id => record,
            other => {
                state.installing = other;
                return Err(OffcacheError::Internal(format!(
                    "worker {} is not installing",
                    id
                )));
            }
        };

        if success {
            record.transition(WorkerState::Installed);
            if let Some(previous) = state.waiting.replace(record) {
                debug!("Waiting worker {} replaced", previous.id);
            }
        } else {
            debug!("Discarding worker {} after failed install", id);
        }

        self.save(&state).await
    }

    /// A waiting worker may activate once it asked to skip waiting or
    /// nothing is active yet
    pub async fn ready_to_activate(&self) -> bool {
        let state = self.state.lock().await;
        match &state.waiting {
            Some(waiting) => waiting.skip_waiting || state.active.is_none(),
            None => false,
        }
    }

    /// Mark the waiting worker as activating. `force` ignores whether it
    /// asked to skip waiting.
    pub async fn begin_activate(&self, force: bool) -> OffcacheResult<WorkerRecord> {
        let mut state = self.state.lock().await;
        let has_active = state.active.is_some();
        let waiting = state
            .waiting
            .as_mut()
            .ok_or(OffcacheError::NoWaitingWorker)?;

        if has_active && !waiting.skip_waiting && !force {
            return Err(OffcacheError::ActivationBlocked {
                id: waiting.id.to_string(),
            });
        }

        waiting.transition(WorkerState::Activating);
        let record = waiting.clone();
        self.save(&state).await?;
        Ok(record)
    }

    /// Settle an activation: success promotes the waiting worker to active;
    /// failure leaves it waiting
    pub async fn finish_activate(&self, id: Uuid, success: bool) -> OffcacheResult<()> {
        let mut state = self.state.lock().await;
        let mut record = match state.waiting.take() {
            Some(record) if record.id == id => record,
            other => {
                state.waiting = other;
                return Err(OffcacheError::Internal(format!(
                    "worker {} is not waiting",
                    id
                )));
            }
        };

        if success {
            record.transition(WorkerState::Activated);
            if let Some(previous) = state.active.replace(record) {
                info!("Worker {} is now redundant", previous.id);
            }
        } else {
            record.transition(WorkerState::Installed);
            state.waiting = Some(record);
        }

        self.save(&state).await
    }

    /// Run a controller's install and settle the registration either way
    pub async fn install(
        &self,
        record: &WorkerRecord,
        controller: &OfflineCacheController,
    ) -> OffcacheResult<InstallReport> {
        let result = controller.install().await;
        self.finish_install(record.id, result.is_ok()).await?;
        result
    }

    /// Run a controller's activate and settle the registration either way
    pub async fn activate(
        &self,
        record: &WorkerRecord,
        controller: &OfflineCacheController,
    ) -> OffcacheResult<ActivateReport> {
        let result = controller.activate().await;
        self.finish_activate(record.id, result.is_ok()).await?;
        result
    }
}

/// `LifecycleHooks` for one instance, applied to its registration
struct RegistrationHooks {
    registration: Arc<Registration>,
    id: Uuid,
}

#[async_trait]
impl LifecycleHooks for RegistrationHooks {
    async fn skip_waiting(&self) -> OffcacheResult<()> {
        let mut state = self.registration.state.lock().await;
        let record = state
            .record_mut(self.id)
            .ok_or_else(|| OffcacheError::Hook(format!("unknown worker {}", self.id)))?;
        record.skip_waiting = true;
        self.registration.save(&state).await?;

        debug!("Worker {} will skip waiting", self.id);
        Ok(())
    }

    async fn claim_clients(&self) -> OffcacheResult<()> {
        let mut state = self.registration.state.lock().await;
        if state.record_mut(self.id).is_none() {
            return Err(OffcacheError::Hook(format!("unknown worker {}", self.id)));
        }
        state.clients_claimed_by = Some(self.id);
        self.registration.save(&state).await?;

        debug!("Worker {} claimed clients", self.id);
        Ok(())
    }
}

//! CLI command implementations

pub mod activate;
pub mod config;
pub mod fetch;
pub mod install;
pub mod register;
pub mod status;
pub mod stores;

pub use activate::execute as activate;
pub use config::execute as config;
pub use fetch::execute as fetch;
pub use install::execute as install;
pub use register::execute as register;
pub use status::execute as status;
pub use stores::execute as stores;

use crate::config::{Config, ConfigManager};
use crate::error::OffcacheResult;
use crate::journal::Journal;
use crate::network::NetworkProvider;
use crate::store::{FsStoreProvider, StoreProvider};
use crate::worker::{ControllerConfig, OfflineCacheController, Registration, WorkerRecord};
use std::sync::Arc;

/// Persistent pieces shared by the lifecycle commands
pub(crate) struct WorkerEnv {
    pub config: Config,
    pub stores: Arc<dyn StoreProvider>,
    pub journal: Journal,
    pub registration: Arc<Registration>,
}

impl WorkerEnv {
    pub async fn load(config: &Config) -> OffcacheResult<Self> {
        let stores = FsStoreProvider::new(ConfigManager::stores_root(config));
        let registration = Registration::load(ConfigManager::registration_path_for(config)).await?;

        Ok(Self {
            config: config.clone(),
            stores: Arc::new(stores),
            journal: Journal::new(config),
            registration,
        })
    }

    /// Controller for one registered instance. The instance keeps the store
    /// version it was installed with even if the config has moved on.
    pub fn controller(
        &self,
        record: &WorkerRecord,
        network: Arc<dyn NetworkProvider>,
    ) -> OfflineCacheController {
        let mut worker_config = ControllerConfig::from_config(&self.config);
        worker_config.store_version = record.store_version.clone();

        OfflineCacheController::new(
            worker_config,
            Arc::clone(&self.stores),
            network,
            self.registration.hooks_for(record.id),
        )
        .with_journal(self.journal.clone())
    }
}

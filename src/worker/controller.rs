//! Offline cache controller
//!
//! Handles the three lifecycle events of one worker instance against a
//! single versioned store:
//!
//! | Event | Effect |
//! |-------|--------|
//! | install | fetch every seed resource, store all of them, then skip waiting |
//! | activate | delete every store except the current version, then claim clients |
//! | fetch | GET only: cache → network (+ detached write-back) → offline fallback |
//!
//! Write-backs run as detached tasks: the requester gets its response
//! without waiting for the store, and a failed write is only logged.

use crate::config::Config;
use crate::error::{OffcacheError, OffcacheResult};
use crate::journal::Journal;
use crate::message::{resolve_url, Request, Response};
use crate::network::NetworkProvider;
use crate::store::{NamedStore, StoreProvider};
use crate::worker::state::{LifecycleHooks, WorkerState};
use futures_util::future::{join_all, try_join_all};
use serde_json::json;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Explicit configuration of one worker instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Absolute URL seed paths resolve against
    pub scope: String,
    /// Name of the current store
    pub store_version: String,
    /// Paths that must be stored once install completes
    pub seed_resources: Vec<String>,
    /// Body of the offline fallback page
    pub fallback_body: String,
}

impl ControllerConfig {
    pub fn new(
        scope: impl Into<String>,
        store_version: impl Into<String>,
        seed_resources: Vec<String>,
    ) -> Self {
        Self {
            scope: scope.into(),
            store_version: store_version.into(),
            seed_resources,
            fallback_body: crate::message::DEFAULT_FALLBACK_BODY.to_string(),
        }
    }

    /// Build from the `[worker]` and `[fallback]` config tables
    pub fn from_config(config: &Config) -> Self {
        Self {
            scope: config.worker.scope.clone(),
            store_version: config.worker.store_version.clone(),
            seed_resources: config.worker.seed_resources.clone(),
            fallback_body: config.fallback.body.clone(),
        }
    }

    pub fn with_fallback_body(mut self, body: impl Into<String>) -> Self {
        self.fallback_body = body.into();
        self
    }

    /// Seed resources as absolute GET requests, duplicates removed in order
    pub fn seed_requests(&self) -> OffcacheResult<Vec<Request>> {
        let mut requests: Vec<Request> = Vec::with_capacity(self.seed_resources.len());
        for path in &self.seed_resources {
            let request = Request::get(resolve_url(&self.scope, path)?)?;
            if requests.iter().any(|r| r.url() == request.url()) {
                debug!("Ignoring duplicate seed resource {}", path);
                continue;
            }
            requests.push(request);
        }
        Ok(requests)
    }
}

/// Outcome of a successful install
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub store_version: String,
    /// Absolute URLs stored
    pub seeded: Vec<String>,
}

/// Outcome of an activate sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    pub store_version: String,
    /// Stale stores removed
    pub deleted: Vec<String>,
    /// Stale stores whose deletion failed
    pub failed: Vec<String>,
}

/// Where an intercepted response came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
    Fallback,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "cache"),
            Self::Network => write!(f, "network"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// Result of dispatching one request to the worker
#[derive(Debug)]
pub enum FetchOutcome {
    /// Not intercepted; the host must apply default network handling
    Passthrough(Request),
    /// The worker answered the request
    Respond {
        response: Response,
        source: ResponseSource,
    },
}

impl FetchOutcome {
    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            Self::Passthrough(_) => None,
            Self::Respond { source, .. } => Some(*source),
        }
    }
}

/// Cache-first request interceptor with install/activate lifecycle
pub struct OfflineCacheController {
    config: ControllerConfig,
    stores: Arc<dyn StoreProvider>,
    network: Arc<dyn NetworkProvider>,
    hooks: Arc<dyn LifecycleHooks>,
    journal: Journal,
    state: RwLock<WorkerState>,
    background: Mutex<JoinSet<()>>,
}

impl OfflineCacheController {
    pub fn new(
        config: ControllerConfig,
        stores: Arc<dyn StoreProvider>,
        network: Arc<dyn NetworkProvider>,
        hooks: Arc<dyn LifecycleHooks>,
    ) -> Self {
        Self {
            config,
            stores,
            network,
            hooks,
            journal: Journal::disabled(),
            state: RwLock::new(WorkerState::Parsed),
            background: Mutex::new(JoinSet::new()),
        }
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    /// Start from a known state, e.g. when the host restarts an instance it
    /// already activated
    pub fn with_state(self, state: WorkerState) -> Self {
        self.set_state(state);
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> WorkerState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: WorkerState) {
        let mut current = self.state.write().unwrap_or_else(|e| e.into_inner());
        if *current != state {
            debug!("Worker state {} -> {}", *current, state);
            *current = state;
        }
    }

    // ------------------------------------------------------------------
    // install
    // ------------------------------------------------------------------

    /// Populate the current store with every seed resource, then request
    /// skip-waiting.
    ///
    /// Fails without leaving partial results if any seed cannot be fetched,
    /// returns a non-2xx status, or cannot be stored.
    pub async fn install(&self) -> OffcacheResult<InstallReport> {
        self.set_state(WorkerState::Installing);

        match self.run_install().await {
            Ok(report) => {
                self.set_state(WorkerState::Installed);
                info!(
                    "Installed {} with {} seed resources",
                    report.store_version,
                    report.seeded.len()
                );
                self.journal
                    .record(
                        "install.completed",
                        &json!({"store": report.store_version, "seeded": report.seeded}),
                    )
                    .await;
                Ok(report)
            }
            Err(e) => {
                self.set_state(WorkerState::Redundant);
                warn!("Install of {} failed: {}", self.config.store_version, e);
                self.journal
                    .record(
                        "install.failed",
                        &json!({
                            "store": self.config.store_version,
                            "error": e.to_string(),
                            "retryable": e.is_retryable(),
                        }),
                    )
                    .await;
                Err(e)
            }
        }
    }

    async fn run_install(&self) -> OffcacheResult<InstallReport> {
        let requests = self.config.seed_requests()?;
        let store = self.stores.open(&self.config.store_version).await?;

        info!(
            "Caching {} seed resources into {}",
            requests.len(),
            self.config.store_version
        );

        // Nothing is written unless every seed fetch succeeds
        let responses = try_join_all(requests.iter().map(|r| self.fetch_seed(r))).await?;

        let mut written: Vec<(&Request, Option<Response>)> = Vec::with_capacity(requests.len());
        for (request, response) in requests.iter().zip(responses) {
            let previous = store.match_request(request).await.unwrap_or(None);
            if let Err(e) = store.put(request, response).await {
                self.roll_back(store.as_ref(), written).await;
                return Err(e);
            }
            written.push((request, previous));
        }

        if let Err(e) = self.hooks.skip_waiting().await {
            self.roll_back(store.as_ref(), written).await;
            return Err(e);
        }

        Ok(InstallReport {
            store_version: self.config.store_version.clone(),
            seeded: requests.iter().map(|r| r.url().to_string()).collect(),
        })
    }

    async fn fetch_seed(&self, request: &Request) -> OffcacheResult<Response> {
        let response = self.network.fetch(request).await?;
        if !response.ok() {
            return Err(OffcacheError::SeedStatus {
                url: request.url().to_string(),
                status: response.status(),
            });
        }
        debug!("Fetched seed {} ({} bytes)", request.url(), response.body_len());
        Ok(response)
    }

    /// Restore entries overwritten by a failed install attempt
    async fn roll_back(&self, store: &dyn NamedStore, written: Vec<(&Request, Option<Response>)>) {
        for (request, previous) in written {
            let result = match previous {
                Some(previous) => store.put(request, previous).await,
                None => store.delete(request).await.map(|_| ()),
            };
            if let Err(e) = result {
                warn!("Failed to roll back {}: {}", request.cache_key(), e);
            }
        }
    }

    // ------------------------------------------------------------------
    // activate
    // ------------------------------------------------------------------

    /// Delete every store other than the current version, then claim clients.
    ///
    /// Deletions are independent and best effort; clients are claimed only
    /// after every deletion has settled.
    pub async fn activate(&self) -> OffcacheResult<ActivateReport> {
        self.set_state(WorkerState::Activating);
        let current = self.config.store_version.as_str();

        let names = match self.stores.keys().await {
            Ok(names) => names,
            Err(e) => {
                warn!("Failed to enumerate stores, skipping cleanup: {}", e);
                vec![]
            }
        };

        let stale: Vec<String> = names.into_iter().filter(|n| n != current).collect();
        let results = join_all(stale.iter().map(|name| async move {
            (name, self.stores.delete(name).await)
        }))
        .await;

        let mut report = ActivateReport {
            store_version: current.to_string(),
            ..Default::default()
        };

        for (name, result) in results {
            match result {
                Ok(true) => {
                    info!("Deleted stale store {}", name);
                    self.journal
                        .record("store.deleted", &json!({"store": name}))
                        .await;
                    report.deleted.push(name.clone());
                }
                Ok(false) => debug!("Stale store {} was already gone", name),
                Err(e) => {
                    warn!("Failed to delete stale store {}: {}", name, e);
                    self.journal
                        .record(
                            "store.delete_failed",
                            &json!({"store": name, "error": e.to_string()}),
                        )
                        .await;
                    report.failed.push(name.clone());
                }
            }
        }

        if let Err(e) = self.hooks.claim_clients().await {
            self.set_state(WorkerState::Installed);
            return Err(e);
        }

        self.set_state(WorkerState::Activated);
        Ok(report)
    }

    // ------------------------------------------------------------------
    // fetch
    // ------------------------------------------------------------------

    /// Answer one outgoing request.
    ///
    /// Non-GET requests are handed back untouched. GET requests are served
    /// from the store, then the network, then the offline fallback page;
    /// this never fails.
    pub async fn handle_fetch(&self, request: Request) -> FetchOutcome {
        if !request.method().is_get() {
            debug!("Passing through {}", request.cache_key());
            return FetchOutcome::Passthrough(request);
        }

        if let Some(response) = self.lookup(&request).await {
            info!("Serving {} from cache", request.url());
            return FetchOutcome::Respond {
                response,
                source: ResponseSource::Cache,
            };
        }

        info!("Fetching {} from network", request.url());
        match self.network.fetch(&request).await {
            Ok(response) => {
                let copy = response.duplicate();
                self.spawn_write_back(request, copy);
                FetchOutcome::Respond {
                    response,
                    source: ResponseSource::Network,
                }
            }
            Err(e) => {
                warn!("Serving offline fallback for {}: {}", request.url(), e);
                let journal = self.journal.clone();
                let data = json!({"url": request.url(), "error": e.to_string()});
                self.detach(async move { journal.record("fetch.fallback", &data).await });

                FetchOutcome::Respond {
                    response: Response::offline_fallback(&self.config.fallback_body),
                    source: ResponseSource::Fallback,
                }
            }
        }
    }

    /// Look `request` up in the current store. Store failures count as a miss.
    async fn lookup(&self, request: &Request) -> Option<Response> {
        self.try_lookup(request).await.unwrap_or_else(|e| {
            warn!("Cache lookup for {} failed: {}", request.cache_key(), e);
            None
        })
    }

    async fn try_lookup(&self, request: &Request) -> OffcacheResult<Option<Response>> {
        let version = &self.config.store_version;
        if !self.stores.has(version).await? {
            return Ok(None);
        }
        let store = self.stores.open(version).await?;
        store.match_request(request).await
    }

    fn spawn_write_back(&self, request: Request, response: Response) {
        let stores = Arc::clone(&self.stores);
        let version = self.config.store_version.clone();
        let journal = self.journal.clone();

        self.detach(async move {
            match write_back(stores.as_ref(), &version, &request, response).await {
                Ok(()) => debug!("Cached {} in {}", request.url(), version),
                Err(e) => {
                    warn!("Write-back of {} failed: {}", request.url(), e);
                    journal
                        .record(
                            "writeback.failed",
                            &json!({"url": request.url(), "store": version, "error": e.to_string()}),
                        )
                        .await;
                }
            }
        });
    }

    /// Run `task` in the background without tying it to the caller
    fn detach<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut background = self.background.lock().unwrap_or_else(|e| e.into_inner());
        while let Some(finished) = background.try_join_next() {
            if let Err(e) = finished {
                warn!("Background task failed: {}", e);
            }
        }
        background.spawn(task);
    }

    /// Wait for every write-back spawned so far.
    ///
    /// Fetch handling never calls this. Hosts call it before shutting down,
    /// since dropping the controller aborts unfinished write-backs.
    pub async fn settle_write_backs(&self) {
        loop {
            let mut pending = {
                let mut background = self.background.lock().unwrap_or_else(|e| e.into_inner());
                std::mem::take(&mut *background)
            };
            if pending.is_empty() {
                break;
            }
            while let Some(finished) = pending.join_next().await {
                if let Err(e) = finished {
                    warn!("Background task failed: {}", e);
                }
            }
        }
    }
}

async fn write_back(
    stores: &dyn StoreProvider,
    version: &str,
    request: &Request,
    response: Response,
) -> OffcacheResult<()> {
    let store = stores.open(version).await?;
    store.put(request, response).await
}

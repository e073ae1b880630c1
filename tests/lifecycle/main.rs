//! Lifecycle scenarios driven through the public API

mod support {
    use async_trait::async_trait;
    use offcache::message::{resolve_url, Headers, Request, Response};
    use offcache::network::NetworkProvider;
    use offcache::store::{EntryInfo, NamedStore, StoreProvider};
    use offcache::worker::LifecycleHooks;
    use offcache::{OffcacheError, OffcacheResult};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    pub const SCOPE: &str = "http://localhost:8080/";

    /// Origin with fixed pages that can be taken offline
    pub struct ScriptedNetwork {
        pages: HashMap<String, Vec<u8>>,
        online: AtomicBool,
        calls: AtomicUsize,
    }

    impl ScriptedNetwork {
        pub fn new(pages: &[(&str, &str)]) -> Arc<Self> {
            Arc::new(Self {
                pages: pages
                    .iter()
                    .map(|(path, body)| {
                        (resolve_url(SCOPE, path).unwrap(), body.as_bytes().to_vec())
                    })
                    .collect(),
                online: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn site() -> Arc<Self> {
            Self::new(&[
                ("/", "<h1>home</h1>"),
                ("/index.html", "<h1>index</h1>"),
                ("/app.js", "console.log(1)"),
                ("/style.css", "body{}"),
            ])
        }

        pub fn set_online(&self, online: bool) {
            self.online.store(online, Ordering::SeqCst);
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NetworkProvider for ScriptedNetwork {
        async fn fetch(&self, request: &Request) -> OffcacheResult<Response> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.online.load(Ordering::SeqCst) {
                return Err(OffcacheError::NetworkUnavailable("offline".to_string()));
            }
            let mut headers = Headers::new();
            headers.set("Content-Type", "text/html");
            Ok(match self.pages.get(request.url()) {
                Some(body) => Response::new(200, headers, body.clone()),
                None => Response::new(404, headers, b"missing".to_vec()),
            })
        }
    }

    /// Hooks that only count calls
    #[derive(Default)]
    pub struct CountingHooks {
        pub skip_waiting: AtomicUsize,
        pub claims: AtomicUsize,
        pub fail_claim: AtomicBool,
    }

    #[async_trait]
    impl LifecycleHooks for CountingHooks {
        async fn skip_waiting(&self) -> OffcacheResult<()> {
            self.skip_waiting.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn claim_clients(&self) -> OffcacheResult<()> {
            if self.fail_claim.load(Ordering::SeqCst) {
                return Err(OffcacheError::Hook("clients unavailable".to_string()));
            }
            self.claims.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Wraps a provider, failing selected operations
    pub struct FaultyStores<P> {
        pub inner: P,
        pub fail_keys: bool,
        pub fail_delete: Vec<String>,
        pub fail_put: bool,
    }

    impl<P> FaultyStores<P> {
        pub fn new(inner: P) -> Self {
            Self {
                inner,
                fail_keys: false,
                fail_delete: vec![],
                fail_put: false,
            }
        }
    }

    struct FaultyStore {
        inner: Arc<dyn NamedStore>,
        fail_put: bool,
    }

    #[async_trait]
    impl<P: StoreProvider> StoreProvider for FaultyStores<P> {
        async fn open(&self, name: &str) -> OffcacheResult<Arc<dyn NamedStore>> {
            Ok(Arc::new(FaultyStore {
                inner: self.inner.open(name).await?,
                fail_put: self.fail_put,
            }))
        }

        async fn has(&self, name: &str) -> OffcacheResult<bool> {
            self.inner.has(name).await
        }

        async fn keys(&self) -> OffcacheResult<Vec<String>> {
            if self.fail_keys {
                return Err(OffcacheError::Internal("enumeration failed".to_string()));
            }
            self.inner.keys().await
        }

        async fn delete(&self, name: &str) -> OffcacheResult<bool> {
            if self.fail_delete.iter().any(|n| n == name) {
                return Err(OffcacheError::Internal(format!("cannot delete {}", name)));
            }
            self.inner.delete(name).await
        }
    }

    #[async_trait]
    impl NamedStore for FaultyStore {
        fn name(&self) -> &str {
            self.inner.name()
        }

        async fn match_request(&self, request: &Request) -> OffcacheResult<Option<Response>> {
            self.inner.match_request(request).await
        }

        async fn put(&self, request: &Request, response: Response) -> OffcacheResult<()> {
            if self.fail_put {
                return Err(OffcacheError::rejected(
                    self.name(),
                    request.cache_key(),
                    "quota exceeded",
                ));
            }
            self.inner.put(request, response).await
        }

        async fn delete(&self, request: &Request) -> OffcacheResult<bool> {
            self.inner.delete(request).await
        }

        async fn keys(&self) -> OffcacheResult<Vec<EntryInfo>> {
            self.inner.keys().await
        }
    }
}

mod scenario_tests {
    use super::support::{CountingHooks, FaultyStores, ScriptedNetwork, SCOPE};
    use offcache::journal::Journal;
    use offcache::message::{Method, Request, FALLBACK_CONTENT_TYPE, FALLBACK_STATUS};
    use offcache::store::{FsStoreProvider, MemoryStoreProvider, StoreProvider};
    use offcache::worker::{
        ControllerConfig, FetchOutcome, OfflineCacheController, Registration, ResponseSource,
        WorkerState,
    };
    use std::sync::atomic::Ordering;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn worker_config(version: &str) -> ControllerConfig {
        ControllerConfig::new(
            SCOPE,
            version,
            vec!["/".to_string(), "/index.html".to_string()],
        )
    }

    fn worker(
        version: &str,
        stores: Arc<dyn StoreProvider>,
        network: Arc<ScriptedNetwork>,
    ) -> OfflineCacheController {
        OfflineCacheController::new(
            worker_config(version),
            stores,
            network,
            Arc::new(CountingHooks::default()),
        )
    }

    async fn fetch(worker: &OfflineCacheController, url: &str) -> (ResponseSource, u16, String) {
        match worker.handle_fetch(Request::get(url).unwrap()).await {
            FetchOutcome::Respond { response, source } => {
                let status = response.status();
                (source, status, response.text())
            }
            FetchOutcome::Passthrough(request) => panic!("GET {} passed through", request.url()),
        }
    }

    async fn offline_scenario(stores: Arc<dyn StoreProvider>) {
        let network = ScriptedNetwork::site();
        let worker = worker("pwa-offline-demo-v1", stores.clone(), network.clone());

        worker.install().await.unwrap();
        worker.activate().await.unwrap();
        assert_eq!(worker.state(), WorkerState::Activated);

        let store = stores.open("pwa-offline-demo-v1").await.unwrap();
        assert_eq!(store.keys().await.unwrap().len(), 2);

        network.set_online(false);

        let (source, status, body) = fetch(&worker, "http://localhost:8080/index.html").await;
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(status, 200);
        assert_eq!(body, "<h1>index</h1>");

        let (source, status, body) = fetch(&worker, "http://localhost:8080/other.js").await;
        assert_eq!(source, ResponseSource::Fallback);
        assert_eq!(status, FALLBACK_STATUS);
        assert!(body.contains("Offline and not cached"));

        worker.settle_write_backs().await;
        assert_eq!(store.keys().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn offline_scenario_in_memory() {
        offline_scenario(Arc::new(MemoryStoreProvider::new())).await;
    }

    #[tokio::test]
    async fn offline_scenario_on_disk() {
        let temp = TempDir::new().unwrap();
        offline_scenario(Arc::new(FsStoreProvider::new(temp.path().join("stores")))).await;
    }

    #[tokio::test]
    async fn fallback_has_html_content_type() {
        let network = ScriptedNetwork::site();
        network.set_online(false);
        let worker = worker("v1", Arc::new(MemoryStoreProvider::new()), network);

        match worker
            .handle_fetch(Request::get("http://localhost:8080/nowhere").unwrap())
            .await
        {
            FetchOutcome::Respond { response, .. } => {
                assert_eq!(
                    response.headers().get("content-type"),
                    Some(FALLBACK_CONTENT_TYPE)
                );
                assert!(response.body_len() > 0);
            }
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn concurrent_fetches_populate_store() {
        let stores = Arc::new(MemoryStoreProvider::new());
        let network = ScriptedNetwork::site();
        let worker = Arc::new(worker("v1", stores.clone(), network.clone()));

        let urls = [
            "http://localhost:8080/app.js",
            "http://localhost:8080/style.css",
            "http://localhost:8080/app.js",
            "http://localhost:8080/",
        ];
        let mut tasks = Vec::new();
        for url in urls {
            let worker = Arc::clone(&worker);
            tasks.push(tokio::spawn(async move {
                match worker.handle_fetch(Request::get(url).unwrap()).await {
                    FetchOutcome::Respond { response, .. } => response.status(),
                    FetchOutcome::Passthrough(_) => 0,
                }
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), 200);
        }
        worker.settle_write_backs().await;

        let store = stores.open("v1").await.unwrap();
        let mut urls: Vec<String> = store
            .keys()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.url)
            .collect();
        urls.sort();
        assert_eq!(
            urls,
            vec![
                "http://localhost:8080/",
                "http://localhost:8080/app.js",
                "http://localhost:8080/style.css",
            ]
        );

        // Now served from the store
        let calls = network.calls();
        let (source, _, _) = fetch(&worker, "http://localhost:8080/style.css").await;
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn non_get_never_touches_store() {
        let stores = Arc::new(MemoryStoreProvider::new());
        let network = ScriptedNetwork::site();
        let worker = worker("v1", stores.clone(), network.clone());
        worker.install().await.unwrap();
        let calls = network.calls();

        for method in [Method::Post, Method::Put, Method::Delete, Method::Head] {
            let request = Request::new(method, "http://localhost:8080/index.html").unwrap();
            let outcome = worker.handle_fetch(request).await;
            assert!(matches!(outcome, FetchOutcome::Passthrough(_)));
        }
        worker.settle_write_backs().await;

        assert_eq!(network.calls(), calls);
        assert_eq!(
            stores.open("v1").await.unwrap().keys().await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn failed_deletion_does_not_block_activation() {
        let mut stores = FaultyStores::new(MemoryStoreProvider::new());
        for name in ["v1", "v2", "v3"] {
            stores.inner.open(name).await.unwrap();
        }
        stores.fail_delete = vec!["v1".to_string()];
        let stores = Arc::new(stores);

        let hooks = Arc::new(CountingHooks::default());
        let worker = OfflineCacheController::new(
            worker_config("v3"),
            stores.clone(),
            ScriptedNetwork::site(),
            hooks.clone(),
        );

        let report = worker.activate().await.unwrap();

        assert_eq!(report.deleted, vec!["v2"]);
        assert_eq!(report.failed, vec!["v1"]);
        assert_eq!(hooks.claims.load(Ordering::SeqCst), 1);
        assert_eq!(stores.keys().await.unwrap(), vec!["v1", "v3"]);
    }

    #[tokio::test]
    async fn enumeration_failure_still_claims() {
        let mut stores = FaultyStores::new(MemoryStoreProvider::new());
        stores.fail_keys = true;

        let hooks = Arc::new(CountingHooks::default());
        let worker = OfflineCacheController::new(
            worker_config("v1"),
            Arc::new(stores),
            ScriptedNetwork::site(),
            hooks.clone(),
        );

        let report = worker.activate().await.unwrap();
        assert!(report.deleted.is_empty());
        assert_eq!(hooks.claims.load(Ordering::SeqCst), 1);
        assert_eq!(worker.state(), WorkerState::Activated);
    }

    #[tokio::test]
    async fn claim_failure_fails_activation() {
        let hooks = Arc::new(CountingHooks::default());
        hooks.fail_claim.store(true, Ordering::SeqCst);
        let worker = OfflineCacheController::new(
            worker_config("v1"),
            Arc::new(MemoryStoreProvider::new()),
            ScriptedNetwork::site(),
            hooks,
        );

        assert!(worker.activate().await.is_err());
        assert_eq!(worker.state(), WorkerState::Installed);
    }

    #[tokio::test]
    async fn write_back_failure_is_journaled_not_surfaced() {
        let temp = TempDir::new().unwrap();
        let journal = Journal::at(temp.path().join("events.log"));
        let mut stores = FaultyStores::new(MemoryStoreProvider::new());
        stores.fail_put = true;

        let worker = OfflineCacheController::new(
            worker_config("v1"),
            Arc::new(stores),
            ScriptedNetwork::site(),
            Arc::new(CountingHooks::default()),
        )
        .with_journal(journal.clone());

        let (source, status, body) = fetch(&worker, "http://localhost:8080/app.js").await;
        assert_eq!(source, ResponseSource::Network);
        assert_eq!(status, 200);
        assert_eq!(body, "console.log(1)");

        worker.settle_write_backs().await;
        let log = tokio::fs::read_to_string(journal.path()).await.unwrap();
        assert!(log.contains("writeback.failed"));
        assert!(log.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn registration_drives_version_upgrade() {
        let temp = TempDir::new().unwrap();
        let stores: Arc<dyn StoreProvider> =
            Arc::new(FsStoreProvider::new(temp.path().join("stores")));
        let registration = Registration::load(temp.path().join("registration.json"))
            .await
            .unwrap();
        let network = ScriptedNetwork::site();

        for version in ["site-v1", "site-v2"] {
            let record = registration.begin_install(version).await.unwrap();
            let worker = OfflineCacheController::new(
                worker_config(version),
                stores.clone(),
                network.clone(),
                registration.hooks_for(record.id),
            );
            registration.install(&record, &worker).await.unwrap();

            assert!(registration.ready_to_activate().await);
            let record = registration.begin_activate(false).await.unwrap();
            registration.activate(&record, &worker).await.unwrap();

            let state = registration.snapshot().await;
            assert_eq!(state.active.as_ref().map(|r| r.id), Some(record.id));
            assert_eq!(state.clients_claimed_by, Some(record.id));
        }

        assert_eq!(stores.keys().await.unwrap(), vec!["site-v2"]);
        assert_eq!(
            registration.active().await.unwrap().store_version,
            "site-v2"
        );
    }

    #[tokio::test]
    async fn failed_upgrade_keeps_serving_previous_version() {
        let temp = TempDir::new().unwrap();
        let stores: Arc<dyn StoreProvider> = Arc::new(MemoryStoreProvider::new());
        let registration = Registration::load(temp.path().join("registration.json"))
            .await
            .unwrap();
        let network = ScriptedNetwork::site();

        let record = registration.begin_install("v1").await.unwrap();
        let first = OfflineCacheController::new(
            worker_config("v1"),
            stores.clone(),
            network.clone(),
            registration.hooks_for(record.id),
        );
        registration.install(&record, &first).await.unwrap();
        let record = registration.begin_activate(false).await.unwrap();
        registration.activate(&record, &first).await.unwrap();

        // The origin has no /gone.html
        let record = registration.begin_install("v2").await.unwrap();
        let second = OfflineCacheController::new(
            ControllerConfig::new(SCOPE, "v2", vec!["/".to_string(), "/gone.html".to_string()]),
            stores.clone(),
            network.clone(),
            registration.hooks_for(record.id),
        );
        assert!(registration.install(&record, &second).await.is_err());
        assert_eq!(second.state(), WorkerState::Redundant);

        let state = registration.snapshot().await;
        assert_eq!(state.active.unwrap().store_version, "v1");
        assert!(state.waiting.is_none());

        network.set_online(false);
        let (source, _, body) = fetch(&first, "http://localhost:8080/").await;
        assert_eq!(source, ResponseSource::Cache);
        assert_eq!(body, "<h1>home</h1>");
    }
}

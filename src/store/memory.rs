//! In-process store provider

use crate::error::{OffcacheError, OffcacheResult};
use crate::message::{Headers, Method, Request, Response};
use crate::store::{check_put, EntryInfo, NamedStore, StoreProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

/// Store provider holding everything in memory
#[derive(Default)]
pub struct MemoryStoreProvider {
    stores: RwLock<BTreeMap<String, Arc<MemoryStore>>>,
}

impl MemoryStoreProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoreProvider for MemoryStoreProvider {
    async fn open(&self, name: &str) -> OffcacheResult<Arc<dyn NamedStore>> {
        let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
        let store = stores
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryStore::new(name)));
        Ok(Arc::clone(store) as Arc<dyn NamedStore>)
    }

    async fn has(&self, name: &str) -> OffcacheResult<bool> {
        let stores = self.stores.read().unwrap_or_else(|e| e.into_inner());
        Ok(stores.contains_key(name))
    }

    async fn keys(&self) -> OffcacheResult<Vec<String>> {
        let stores = self.stores.read().unwrap_or_else(|e| e.into_inner());
        Ok(stores.keys().cloned().collect())
    }

    async fn delete(&self, name: &str) -> OffcacheResult<bool> {
        let mut stores = self.stores.write().unwrap_or_else(|e| e.into_inner());
        match stores.remove(name) {
            Some(store) => {
                store.deleted.store(true, Ordering::SeqCst);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

struct MemoryEntry {
    method: Method,
    url: String,
    status: u16,
    status_text: String,
    headers: Headers,
    body: Vec<u8>,
    stored_at: DateTime<Utc>,
}

/// A single in-memory store
pub struct MemoryStore {
    name: String,
    entries: RwLock<BTreeMap<String, MemoryEntry>>,
    /// Set once the provider drops this store; handles still held must not write
    deleted: AtomicBool,
}

impl MemoryStore {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(BTreeMap::new()),
            deleted: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl NamedStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> OffcacheResult<Option<Response>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&request.cache_key()).map(|entry| {
            Response::new(entry.status, entry.headers.clone(), entry.body.clone())
                .with_status_text(entry.status_text.clone())
        }))
    }

    async fn put(&self, request: &Request, response: Response) -> OffcacheResult<()> {
        check_put(&self.name, request, &response)?;
        if self.deleted.load(Ordering::SeqCst) {
            return Err(OffcacheError::StoreNotFound(self.name.clone()));
        }

        let (status, status_text, headers, body) = response.into_parts();
        let entry = MemoryEntry {
            method: request.method(),
            url: request.url().to_string(),
            status,
            status_text,
            headers,
            body,
            stored_at: Utc::now(),
        };

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(request.cache_key(), entry);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> OffcacheResult<bool> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        Ok(entries.remove(&request.cache_key()).is_some())
    }

    async fn keys(&self) -> OffcacheResult<Vec<EntryInfo>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let mut infos: Vec<EntryInfo> = entries
            .values()
            .map(|e| EntryInfo {
                method: e.method,
                url: e.url.clone(),
                status: e.status,
                body_len: e.body.len(),
                stored_at: e.stored_at,
            })
            .collect();
        infos.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(infos)
    }
}

//! Persistent keyed response stores
//!
//! A `StoreProvider` owns a set of named stores, one per worker version.
//! Each `NamedStore` maps a request descriptor (method + URL) to a response
//! snapshot.
//!
//! # Put rules
//!
//! | Request / response | Result |
//! |--------------------|--------|
//! | non-GET request    | rejected |
//! | 206 Partial Content | rejected |
//! | anything else      | stored, replacing any previous entry (last write wins) |

mod fs;
mod memory;

pub use fs::FsStoreProvider;
pub use memory::MemoryStoreProvider;

use crate::error::{OffcacheError, OffcacheResult};
use crate::message::{Method, Request, Response};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Metadata about a stored entry, without its body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub method: Method,
    pub url: String,
    pub status: u16,
    pub body_len: usize,
    pub stored_at: DateTime<Utc>,
}

/// Provider of named, versioned stores
#[async_trait]
pub trait StoreProvider: Send + Sync {
    /// Open the store called `name`, creating it if absent
    async fn open(&self, name: &str) -> OffcacheResult<Arc<dyn NamedStore>>;

    /// Check whether a store exists without creating it
    async fn has(&self, name: &str) -> OffcacheResult<bool>;

    /// Names of every persisted store
    async fn keys(&self) -> OffcacheResult<Vec<String>>;

    /// Delete a whole store. Returns `false` if it did not exist.
    async fn delete(&self, name: &str) -> OffcacheResult<bool>;
}

/// A single keyed collection of request → response snapshots
#[async_trait]
pub trait NamedStore: Send + Sync {
    fn name(&self) -> &str;

    /// Find the snapshot stored for `request`, as a fresh response
    async fn match_request(&self, request: &Request) -> OffcacheResult<Option<Response>>;

    /// Store `response` under `request`, consuming it
    async fn put(&self, request: &Request, response: Response) -> OffcacheResult<()>;

    /// Remove the entry for `request`. Returns `false` if there was none.
    async fn delete(&self, request: &Request) -> OffcacheResult<bool>;

    /// Every stored entry, ordered by URL
    async fn keys(&self) -> OffcacheResult<Vec<EntryInfo>>;
}

/// Reject entries the store never holds
pub(crate) fn check_put(store: &str, request: &Request, response: &Response) -> OffcacheResult<()> {
    if !request.method().is_get() {
        return Err(OffcacheError::rejected(
            store,
            request.cache_key(),
            format!("{} requests are not cacheable", request.method()),
        ));
    }
    if response.status() == 206 {
        return Err(OffcacheError::rejected(
            store,
            request.cache_key(),
            "partial responses (206) are not cacheable",
        ));
    }
    Ok(())
}

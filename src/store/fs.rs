//! Filesystem-backed store provider
//!
//! Layout under the provider root:
//!
//! ```text
//! <root>/<name-hash>/store.json          manifest: {"name": ..., "created_at": ...}
//! <root>/<name-hash>/entries/<key-hash>.entry
//! ```
//!
//! Directory and file names are the first 16 bytes of a SHA256 hash, hex
//! encoded, so any store name or URL maps to a safe path. An entry file is a
//! single JSON metadata line followed by the raw body bytes. Entries are
//! written to a unique temporary file and renamed into place, so concurrent
//! writers to one key never leave a torn entry behind.

use crate::error::{OffcacheError, OffcacheResult};
use crate::message::{Headers, Method, Request, Response};
use crate::store::{check_put, EntryInfo, NamedStore, StoreProvider};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};
use uuid::Uuid;

const MANIFEST_FILE: &str = "store.json";
const ENTRIES_DIR: &str = "entries";
const ENTRY_EXT: &str = "entry";

/// Hash `input` with SHA256, returning the first 32 hex chars
fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let result = hasher.finalize();
    hex::encode(&result[..16])
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    name: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    method: Method,
    url: String,
    status: u16,
    status_text: String,
    headers: Headers,
    stored_at: DateTime<Utc>,
}

/// Write `contents` next to `path` under a unique name, then rename it over `path`
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let tmp = dir.join(format!(".tmp-{}", Uuid::new_v4()));
    fs::write(&tmp, contents).await?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}

/// Store provider persisting each store as a directory
pub struct FsStoreProvider {
    root: PathBuf,
}

impl FsStoreProvider {
    /// Create a provider rooted at `root`. Nothing is created until a store
    /// is opened.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn store_dir(&self, name: &str) -> PathBuf {
        self.root.join(short_hash(name))
    }

    async fn read_manifest(dir: &Path) -> OffcacheResult<Manifest> {
        let path = dir.join(MANIFEST_FILE);
        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| OffcacheError::io(format!("reading manifest {}", path.display()), e))?;
        serde_json::from_str(&content).map_err(|e| OffcacheError::StoreCorrupt {
            path,
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl StoreProvider for FsStoreProvider {
    async fn open(&self, name: &str) -> OffcacheResult<Arc<dyn NamedStore>> {
        let dir = self.store_dir(name);
        let entries = dir.join(ENTRIES_DIR);

        fs::create_dir_all(&entries)
            .await
            .map_err(|e| OffcacheError::StoreOpen {
                name: name.to_string(),
                reason: format!("creating {}: {}", entries.display(), e),
            })?;

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            let manifest = Manifest {
                name: name.to_string(),
                created_at: Utc::now(),
            };
            let content = serde_json::to_vec_pretty(&manifest)?;
            write_atomic(&manifest_path, &content)
                .await
                .map_err(|e| OffcacheError::StoreOpen {
                    name: name.to_string(),
                    reason: format!("writing manifest: {}", e),
                })?;
            debug!("Created store {} at {}", name, dir.display());
        }

        Ok(Arc::new(FsStore {
            name: name.to_string(),
            entries_dir: entries,
        }))
    }

    async fn has(&self, name: &str) -> OffcacheResult<bool> {
        Ok(self.store_dir(name).join(MANIFEST_FILE).exists())
    }

    async fn keys(&self) -> OffcacheResult<Vec<String>> {
        if !self.root.exists() {
            return Ok(vec![]);
        }

        let mut names = vec![];
        let mut dirs = fs::read_dir(&self.root)
            .await
            .map_err(|e| OffcacheError::io(format!("reading {}", self.root.display()), e))?;

        while let Some(entry) = dirs
            .next_entry()
            .await
            .map_err(|e| OffcacheError::io("reading store directory entry", e))?
        {
            let path = entry.path();
            if !path.join(MANIFEST_FILE).exists() {
                continue;
            }
            match Self::read_manifest(&path).await {
                Ok(manifest) => names.push(manifest.name),
                Err(e) => warn!("Skipping unreadable store at {}: {}", path.display(), e),
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> OffcacheResult<bool> {
        let dir = self.store_dir(name);
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir)
            .await
            .map_err(|e| OffcacheError::io(format!("deleting store {}", name), e))?;
        debug!("Deleted store {} at {}", name, dir.display());
        Ok(true)
    }
}

/// A store backed by one directory of entry files
pub struct FsStore {
    name: String,
    entries_dir: PathBuf,
}

impl FsStore {
    fn entry_path(&self, request: &Request) -> PathBuf {
        self.entries_dir
            .join(format!("{}.{}", short_hash(&request.cache_key()), ENTRY_EXT))
    }

    /// Split an entry file into its metadata line and body
    fn decode(path: &Path, raw: Vec<u8>) -> OffcacheResult<(EntryMeta, Vec<u8>)> {
        let newline = raw
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| OffcacheError::StoreCorrupt {
                path: path.to_path_buf(),
                reason: "missing metadata line".to_string(),
            })?;

        let meta: EntryMeta =
            serde_json::from_slice(&raw[..newline]).map_err(|e| OffcacheError::StoreCorrupt {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        Ok((meta, raw[newline + 1..].to_vec()))
    }

    async fn read_entry(&self, path: &Path) -> OffcacheResult<Option<(EntryMeta, Vec<u8>)>> {
        match fs::read(path).await {
            Ok(raw) => Self::decode(path, raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(OffcacheError::io(
                format!("reading entry {}", path.display()),
                e,
            )),
        }
    }
}

#[async_trait]
impl NamedStore for FsStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn match_request(&self, request: &Request) -> OffcacheResult<Option<Response>> {
        let path = self.entry_path(request);
        let Some((meta, body)) = self.read_entry(&path).await? else {
            return Ok(None);
        };

        if meta.method != request.method() || meta.url != request.url() {
            warn!(
                "Entry {} belongs to {} {}, not {}",
                path.display(),
                meta.method,
                meta.url,
                request.cache_key()
            );
            return Ok(None);
        }

        Ok(Some(
            Response::new(meta.status, meta.headers, body).with_status_text(meta.status_text),
        ))
    }

    async fn put(&self, request: &Request, response: Response) -> OffcacheResult<()> {
        check_put(&self.name, request, &response)?;

        let (status, status_text, headers, body) = response.into_parts();
        let meta = EntryMeta {
            method: request.method(),
            url: request.url().to_string(),
            status,
            status_text,
            headers,
            stored_at: Utc::now(),
        };

        let mut raw = serde_json::to_vec(&meta)?;
        raw.push(b'\n');
        raw.extend_from_slice(&body);

        let path = self.entry_path(request);
        write_atomic(&path, &raw).await.map_err(|e| {
            OffcacheError::io(
                format!("writing {} to store {}", request.cache_key(), self.name),
                e,
            )
        })?;

        debug!("Stored {} ({} bytes) in {}", request.cache_key(), body.len(), self.name);
        Ok(())
    }

    async fn delete(&self, request: &Request) -> OffcacheResult<bool> {
        let path = self.entry_path(request);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(OffcacheError::io(
                format!("deleting entry {}", path.display()),
                e,
            )),
        }
    }

    async fn keys(&self) -> OffcacheResult<Vec<EntryInfo>> {
        if !self.entries_dir.exists() {
            return Ok(vec![]);
        }

        let mut infos = vec![];
        let mut files = fs::read_dir(&self.entries_dir)
            .await
            .map_err(|e| OffcacheError::io(format!("reading store {}", self.name), e))?;

        while let Some(file) = files
            .next_entry()
            .await
            .map_err(|e| OffcacheError::io("reading store entry", e))?
        {
            let path = file.path();
            if !path.extension().is_some_and(|ext| ext == ENTRY_EXT) {
                continue;
            }
            match self.read_entry(&path).await {
                Ok(Some((meta, body))) => infos.push(EntryInfo {
                    method: meta.method,
                    url: meta.url,
                    status: meta.status,
                    body_len: body.len(),
                    stored_at: meta.stored_at,
                }),
                Ok(None) => {}
                Err(e) => warn!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        infos.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(infos)
    }
}

//! Network fetch providers
//!
//! The worker never talks to sockets directly; it asks a `NetworkProvider`
//! to perform a request:
//! - `HttpNetwork`: real HTTP through a blocking ureq agent
//! - `OfflineNetwork`: every fetch fails, as when the device is offline

mod http;

pub use http::HttpNetwork;

use crate::error::{OffcacheError, OffcacheResult};
use crate::message::{Request, Response};
use async_trait::async_trait;

/// Issues requests to the network
///
/// A non-2xx status is still a successful fetch. Only transport failures
/// (offline, DNS, refused connection) are errors.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    async fn fetch(&self, request: &Request) -> OffcacheResult<Response>;
}

/// Network provider for a disconnected device
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNetwork;

#[async_trait]
impl NetworkProvider for OfflineNetwork {
    async fn fetch(&self, request: &Request) -> OffcacheResult<Response> {
        Err(OffcacheError::NetworkUnavailable(format!(
            "offline, cannot fetch {}",
            request.url()
        )))
    }
}

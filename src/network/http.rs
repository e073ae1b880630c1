//! HTTP network provider backed by ureq

use crate::error::{OffcacheError, OffcacheResult};
use crate::message::{Headers, Request, Response};
use crate::network::NetworkProvider;
use async_trait::async_trait;
use tracing::debug;
use ureq::Agent;

/// Performs requests with a shared ureq agent on the blocking thread pool
#[derive(Clone)]
pub struct HttpNetwork {
    agent: Agent,
}

impl HttpNetwork {
    pub fn new() -> Self {
        // Statuses are data for the worker, not transport errors
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }

    fn fetch_blocking(agent: &Agent, request: &Request) -> OffcacheResult<Response> {
        let mut builder = ureq::http::Request::builder()
            .method(request.method().as_str())
            .uri(request.url());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        let http_request = builder
            .body(())
            .map_err(|e| OffcacheError::network(request.url(), e.to_string()))?;

        let mut response = agent
            .run(http_request)
            .map_err(|e| OffcacheError::network(request.url(), e.to_string()))?;

        let status = response.status();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        // ureq caps read_to_vec at 10 MB unless told otherwise
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| OffcacheError::network(request.url(), e.to_string()))?;

        let mut snapshot = Response::new(status.as_u16(), headers, body);
        if let Some(reason) = status.canonical_reason() {
            snapshot = snapshot.with_status_text(reason);
        }
        Ok(snapshot)
    }
}

impl Default for HttpNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkProvider for HttpNetwork {
    async fn fetch(&self, request: &Request) -> OffcacheResult<Response> {
        debug!("Network fetch {}", request.cache_key());

        let agent = self.agent.clone();
        let request = request.clone();
        tokio::task::spawn_blocking(move || Self::fetch_blocking(&agent, &request))
            .await
            .map_err(|e| OffcacheError::Internal(format!("network task failed: {}", e)))?
    }
}

//! Response snapshots
//!
//! A `Response` owns its body and is deliberately not `Clone`. Reading the
//! body consumes the response, so a snapshot that must reach two consumers
//! (the requester and the store) has to be `duplicate`d first.

use crate::message::Headers;

/// Content type of the synthetic offline page
pub const FALLBACK_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Body served when both cache and network are unavailable
pub const DEFAULT_FALLBACK_BODY: &str = "<h1>⚠️ Offline and not cached</h1>";

/// Status of the synthetic offline page
pub const FALLBACK_STATUS: u16 = 503;

/// Captured response: status, headers and a single-consumption body
#[derive(Debug, PartialEq, Eq)]
pub struct Response {
    status: u16,
    status_text: String,
    headers: Headers,
    body: Vec<u8>,
}

impl Response {
    /// Create a response with the canonical reason phrase for `status`
    pub fn new(status: u16, headers: Headers, body: Vec<u8>) -> Self {
        Self {
            status,
            status_text: status_text(status).to_string(),
            headers,
            body,
        }
    }

    /// Replace the reason phrase
    pub fn with_status_text(mut self, status_text: impl Into<String>) -> Self {
        self.status_text = status_text.into();
        self
    }

    /// Synthetic HTML page returned when a request cannot be served at all
    pub fn offline_fallback(body: &str) -> Self {
        let mut headers = Headers::new();
        headers.set("Content-Type", FALLBACK_CONTENT_TYPE);
        Self::new(FALLBACK_STATUS, headers, body.as_bytes().to_vec())
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Status in the 200-299 range
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Size of the body in bytes, without consuming it
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Produce an independent copy so both the requester and the store can
    /// each consume one
    pub fn duplicate(&self) -> Self {
        Self {
            status: self.status,
            status_text: self.status_text.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }

    /// Consume the response, returning its body bytes
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Consume the response, returning its body as (lossy) UTF-8 text
    pub fn text(self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Consume the response, returning every part
    pub fn into_parts(self) -> (u16, String, Headers, Vec<u8>) {
        (self.status, self.status_text, self.headers, self.body)
    }
}

/// Reason phrase for common status codes
fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        206 => "Partial Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

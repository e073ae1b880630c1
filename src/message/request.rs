//! Request descriptors
//!
//! A request is identified for caching by its method and absolute URL.
//! Headers travel with the request to the network but never take part in
//! the cache key.

use crate::error::{OffcacheError, OffcacheResult};
use crate::message::Headers;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// HTTP request methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
    Patch,
}

impl Method {
    /// Only GET requests are eligible for interception and caching
    pub fn is_get(&self) -> bool {
        matches!(self, Self::Get)
    }

    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Patch => "PATCH",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Method {
    type Err = OffcacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "OPTIONS" => Ok(Self::Options),
            "PATCH" => Ok(Self::Patch),
            _ => Err(OffcacheError::InvalidMethod(s.to_string())),
        }
    }
}

/// An outgoing request as seen by the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Headers,
}

impl Request {
    /// Create a request for an absolute http(s) URL
    pub fn new(method: Method, url: impl Into<String>) -> OffcacheResult<Self> {
        let url = url.into();
        if !is_absolute(&url) {
            return Err(OffcacheError::InvalidUrl(url));
        }
        Ok(Self {
            method,
            url,
            headers: Headers::new(),
        })
    }

    /// Create a GET request
    pub fn get(url: impl Into<String>) -> OffcacheResult<Self> {
        Self::new(Method::Get, url)
    }

    /// Add a header, builder style
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Key under which this request is stored: `"<METHOD> <URL>"`
    pub fn cache_key(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

fn is_absolute(url: &str) -> bool {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"));
    matches!(rest, Some(r) if !r.is_empty() && !r.starts_with('/'))
}

/// Resolve a seed path or request target against the worker scope.
///
/// Absolute http(s) URLs are returned unchanged. Paths starting with `/`
/// resolve against the scope's origin; other relative paths resolve against
/// the scope itself.
pub fn resolve_url(scope: &str, target: &str) -> OffcacheResult<String> {
    if is_absolute(target) {
        return Ok(target.to_string());
    }
    if !is_absolute(scope) {
        return Err(OffcacheError::InvalidUrl(scope.to_string()));
    }

    if let Some(path) = target.strip_prefix('/') {
        Ok(format!("{}/{}", origin_of(scope), path))
    } else {
        let base = match scope.rfind('/') {
            Some(idx) if idx > origin_of(scope).len() => &scope[..=idx],
            _ => return Ok(format!("{}/{}", origin_of(scope), target)),
        };
        Ok(format!("{}{}", base, target))
    }
}

/// `scheme://host[:port]` part of an absolute URL
fn origin_of(url: &str) -> &str {
    let after_scheme = url.find("://").map(|i| i + 3).unwrap_or(0);
    match url[after_scheme..].find('/') {
        Some(idx) => &url[..after_scheme + idx],
        None => url,
    }
}

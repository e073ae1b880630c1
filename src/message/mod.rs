//! Request descriptors and response snapshots exchanged between the worker,
//! its store and the network

mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::{resolve_url, Method, Request};
pub use response::{Response, DEFAULT_FALLBACK_BODY, FALLBACK_CONTENT_TYPE, FALLBACK_STATUS};

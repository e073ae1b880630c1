//! Offcache - offline cache controller
//!
//! Intercepts outgoing requests for a scope and answers them cache-first,
//! falling back to the network and finally to an offline page. Each worker
//! version seeds its own store on install and deletes every other version's
//! store on activate.

pub mod cli;
pub mod config;
pub mod error;
pub mod journal;
pub mod message;
pub mod network;
pub mod store;
pub mod ui;
pub mod worker;

pub use error::{OffcacheError, OffcacheResult};

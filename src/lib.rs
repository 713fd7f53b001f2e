//! npm-cache - content-addressed node_modules cache
//!
//! Dependency trees are keyed by the manifest hash and the platform
//! signature, stored as task artifacts in the queue and located
//! through the index.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod remote;

pub use error::{NpmCacheError, NpmCacheResult};

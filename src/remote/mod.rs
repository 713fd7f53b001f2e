//! Remote collaborators: task queue, namespace index, blob transfer
//!
//! The pipelines only see the [`Queue`], [`Index`] and [`Transport`]
//! traits. [`create_services`] wires the HTTP implementations for the
//! configured endpoints.

pub mod http;
pub mod service;
pub mod taskcluster;
pub mod types;

pub use http::HttpClient;
pub use service::{Index, Queue, Transport};
pub use taskcluster::{create_services, IndexClient, QueueClient, Services};
pub use types::{ArtifactRequest, ArtifactTarget, IndexEntry, IndexedTask, NpmCacheExtra, Task};

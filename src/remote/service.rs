//! Remote service abstraction
//!
//! Narrow interfaces onto the task queue, the namespace index and raw
//! blob transfer. Implemented over HTTP in [`super::taskcluster`] and
//! [`super::http`]; tests substitute in-memory versions.

use crate::error::NpmCacheResult;
use crate::remote::types::{ArtifactRequest, ArtifactTarget, IndexEntry, IndexedTask, Task};
use async_trait::async_trait;
use std::path::Path;

/// Task queue: task definitions and artifact storage
#[async_trait]
pub trait Queue: Send + Sync {
    /// Fetch a task definition
    async fn get_task(&self, task_id: &str) -> NpmCacheResult<Task>;

    /// Request a write target for an artifact of a task run
    async fn create_artifact(
        &self,
        task_id: &str,
        run_id: u32,
        name: &str,
        request: &ArtifactRequest,
    ) -> NpmCacheResult<ArtifactTarget>;

    /// URL serving the named artifact from the task's latest run
    fn latest_artifact_url(&self, task_id: &str, name: &str) -> String;
}

/// Namespace index: key to producing task
#[async_trait]
pub trait Index: Send + Sync {
    /// Look up a namespace; absence is a `NotFound` service error
    async fn find_task(&self, namespace: &str) -> NpmCacheResult<IndexedTask>;

    /// Insert a namespace entry
    async fn insert_task(&self, namespace: &str, entry: &IndexEntry) -> NpmCacheResult<()>;
}

/// Raw blob transfer over URLs
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET a URL and return the body as text
    async fn fetch_text(&self, url: &str) -> NpmCacheResult<String>;

    /// GET a URL into a local file, returning the bytes written
    async fn download(&self, url: &str, dest: &Path) -> NpmCacheResult<u64>;

    /// PUT a local file to a URL with the given headers
    async fn upload(&self, url: &str, source: &Path, headers: &[(&str, String)]) -> NpmCacheResult<()>;
}

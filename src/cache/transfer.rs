//! Artifact upload and download
//!
//! Upload is a two-step handshake: ask the queue for a write target,
//! then PUT the archive bytes there. Downloads address the artifact of
//! a task's latest run.

use crate::error::{NpmCacheError, NpmCacheResult};
use crate::remote::{ArtifactRequest, Queue, Transport};
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::{debug, info};

/// Artifact path of the cached module archive
pub const ARTIFACT_NAME: &str = "public/node_modules.tar.gz";

/// Storage kind requested from the queue (pre-signed object store)
pub const STORAGE_TYPE: &str = "s3";

pub const CONTENT_TYPE: &str = "application/x-tar";
pub const CONTENT_ENCODING: &str = "gzip";

/// Moves module archives to and from the artifact store
pub struct ArtifactTransfer<'a> {
    queue: &'a dyn Queue,
    transport: &'a dyn Transport,
}

impl<'a> ArtifactTransfer<'a> {
    pub fn new(queue: &'a dyn Queue, transport: &'a dyn Transport) -> Self {
        Self { queue, transport }
    }

    /// Publish `archive` as the cache artifact of `task_id`/`run_id`.
    ///
    /// Returns only after the store has acknowledged the full body.
    pub async fn upload(
        &self,
        task_id: &str,
        run_id: u32,
        archive: &Path,
        expires: DateTime<Utc>,
    ) -> NpmCacheResult<()> {
        let size = tokio::fs::metadata(archive)
            .await
            .map_err(|e| NpmCacheError::io(format!("reading {}", archive.display()), e))?
            .len();

        let request = ArtifactRequest {
            storage_type: STORAGE_TYPE.to_string(),
            expires,
            content_type: CONTENT_TYPE.to_string(),
        };

        let target = self
            .queue
            .create_artifact(task_id, run_id, ARTIFACT_NAME, &request)
            .await
            .map_err(|e| NpmCacheError::UploadFailed(format!("creating artifact: {}", e)))?;
        debug!("Artifact write target acquired for {}/{}", task_id, run_id);

        let headers = [
            ("Content-Length", size.to_string()),
            ("Content-Type", CONTENT_TYPE.to_string()),
            ("Content-Encoding", CONTENT_ENCODING.to_string()),
        ];
        self.transport
            .upload(&target.put_url, archive, &headers)
            .await?;

        info!("Uploaded {} ({} bytes) to task {}", ARTIFACT_NAME, size, task_id);
        Ok(())
    }

    /// URL of the cache artifact published by `task_id`
    pub fn artifact_url(&self, task_id: &str) -> String {
        self.queue.latest_artifact_url(task_id, ARTIFACT_NAME)
    }

    /// Fetch an artifact URL into `dest`
    pub async fn download(&self, url: &str, dest: &Path) -> NpmCacheResult<u64> {
        self.transport.download(url, dest).await
    }
}

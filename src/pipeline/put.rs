//! Cache population for a caching task
//!
//! fetch task -> validate extra -> fetch manifest -> key -> index
//! lookup -> on miss: install, export, upload, register.

use crate::cache::{
    fingerprint, manifest_hash, ArtifactTransfer, CacheIndex, Installer, Lookup, Manifest,
    ManifestPolicy, PlatformSignature, Workspace,
};
use crate::error::NpmCacheResult;
use crate::remote::{Index, IndexEntry, NpmCacheExtra, Queue, Transport};
use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

/// Inputs of one put run
#[derive(Debug, Clone)]
pub struct PutRequest {
    /// Task whose `extra.npmCache` describes the manifest, and which
    /// receives the artifact
    pub task_id: String,
    pub run_id: u32,
    pub namespace: String,
    pub policy: ManifestPolicy,
}

/// Result of a put run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    /// The key was already registered; nothing was installed or uploaded
    AlreadyCached { key: String, task_id: String },
    /// Modules were installed, uploaded and registered under `key`
    Published { key: String },
}

/// Populates the cache from a caching task
pub struct PutPipeline<'a> {
    queue: &'a dyn Queue,
    index: &'a dyn Index,
    transport: &'a dyn Transport,
    installer: &'a Installer,
    signature: &'a PlatformSignature,
}

impl<'a> PutPipeline<'a> {
    pub fn new(
        queue: &'a dyn Queue,
        index: &'a dyn Index,
        transport: &'a dyn Transport,
        installer: &'a Installer,
        signature: &'a PlatformSignature,
    ) -> Self {
        Self {
            queue,
            index,
            transport,
            installer,
            signature,
        }
    }

    pub async fn run(&self, request: &PutRequest) -> NpmCacheResult<PutOutcome> {
        let task = self.queue.get_task(&request.task_id).await?;
        let extra = NpmCacheExtra::from_task(&request.task_id, &task, Utc::now())?;
        debug!("Manifest source: {}", extra.url);

        let text = self.transport.fetch_text(&extra.url).await?;
        let manifest = Manifest::parse(text)?.apply(request.policy)?;
        debug!("Dependencies: {}", manifest.dependency_names().join(", "));

        let key = fingerprint(manifest.text(), &request.namespace, self.signature);
        let index = CacheIndex::new(self.index);

        if let Lookup::Hit(existing) = index.lookup(&key).await? {
            info!("Already cached by task {}, nothing to do", existing.task_id);
            return Ok(PutOutcome::AlreadyCached {
                key,
                task_id: existing.task_id,
            });
        }

        let mut workspace = Workspace::create()?;
        let result = self
            .populate(&workspace, &manifest, &extra, request, &key, &index)
            .await;
        workspace.destroy();
        result?;

        Ok(PutOutcome::Published { key })
    }

    async fn populate(
        &self,
        workspace: &Workspace,
        manifest: &Manifest,
        extra: &NpmCacheExtra,
        request: &PutRequest,
        key: &str,
        index: &CacheIndex<'_>,
    ) -> NpmCacheResult<()> {
        workspace.install(manifest, self.installer).await?;
        let archive = workspace.export_tar().await?;

        ArtifactTransfer::new(self.queue, self.transport)
            .upload(&request.task_id, request.run_id, &archive, extra.expires)
            .await?;

        let entry = IndexEntry {
            task_id: request.task_id.clone(),
            rank: 0,
            data: json!({
                "signature": self.signature.as_str(),
                "manifestHash": manifest_hash(manifest.text()),
            }),
            expires: extra.expires,
        };
        index.register(key, &entry).await
    }
}

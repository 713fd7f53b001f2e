//! Cache consumption for a local project
//!
//! read manifest -> key -> index lookup -> on hit: download and
//! extract (then optionally install), on miss: install locally.

use crate::cache::workspace::MANIFEST_FILE;
use crate::cache::{
    fingerprint, ArtifactTransfer, CacheIndex, Installer, Lookup, Manifest, ManifestPolicy,
    PlatformSignature, Workspace,
};
use crate::error::{NpmCacheError, NpmCacheResult};
use crate::remote::{Index, Queue, Transport};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Inputs of one get run
#[derive(Debug, Clone)]
pub struct GetRequest {
    pub manifest_path: PathBuf,
    pub namespace: String,
    /// Directory receiving `node_modules`
    pub target: PathBuf,
    /// Run the installer after extracting a hit
    pub post_install: bool,
    /// Run the installer on a miss; when false a miss is an error
    pub fallback_install: bool,
    pub policy: ManifestPolicy,
}

/// Result of a get run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GetOutcome {
    /// Cached modules from `task_id` were extracted into the target
    Extracted {
        key: String,
        task_id: String,
        post_installed: bool,
    },
    /// Nothing cached; modules were installed locally
    Installed { key: String },
}

/// Restores `node_modules` from the cache
pub struct GetPipeline<'a> {
    queue: &'a dyn Queue,
    index: &'a dyn Index,
    transport: &'a dyn Transport,
    installer: &'a Installer,
    signature: &'a PlatformSignature,
}

impl<'a> GetPipeline<'a> {
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

    pub async fn run(&self, request: &GetRequest) -> NpmCacheResult<GetOutcome> {
        let manifest = Manifest::read(&request.manifest_path)
            .await?
            .apply(request.policy)?;
        let key = fingerprint(manifest.text(), &request.namespace, self.signature);

        let lookup = CacheIndex::new(self.index).lookup(&key).await?;
        let task = match lookup {
            Lookup::Hit(task) => task,
            Lookup::Miss if !request.fallback_install => {
                return Err(NpmCacheError::CacheMiss(key));
            }
            Lookup::Miss => {
                self.install_in_place(&request.target, &manifest).await?;
                return Ok(GetOutcome::Installed { key });
            }
        };

        let transfer = ArtifactTransfer::new(self.queue, self.transport);
        let url = transfer.artifact_url(&task.task_id);
        debug!("Cached modules at {}", url);

        tokio::fs::create_dir_all(&request.target)
            .await
            .map_err(|e| NpmCacheError::io(format!("creating {}", request.target.display()), e))?;

        let mut workspace = Workspace::create()?;
        let result = workspace.extract(&url, &request.target, &transfer).await;
        workspace.destroy();
        result?;
        info!("Restored node_modules into {}", request.target.display());

        if request.post_install {
            self.install_in_place(&request.target, &manifest).await?;
        }

        Ok(GetOutcome::Extracted {
            key,
            task_id: task.task_id,
            post_installed: request.post_install,
        })
    }

    /// Run the installer in `target`, seeding it with the manifest if it
    /// has none of its own
    async fn install_in_place(&self, target: &Path, manifest: &Manifest) -> NpmCacheResult<()> {
        tokio::fs::create_dir_all(target)
            .await
            .map_err(|e| NpmCacheError::io(format!("creating {}", target.display()), e))?;

        let manifest_path = target.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            debug!("Writing manifest to {}", manifest_path.display());
            tokio::fs::write(&manifest_path, manifest.text())
                .await
                .map_err(|e| NpmCacheError::io(format!("writing {}", manifest_path.display()), e))?;
        }

        self.installer.run(target).await
    }
}

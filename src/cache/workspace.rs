//! Scratch directory for one install or extraction
//!
//! Lifecycle: create -> populate (install or extract, once) ->
//! optionally export -> destroy. The directory is removed on drop if
//! `destroy` was never called.

use crate::cache::archive::{pack_modules, unpack_modules, ARCHIVE_NAME, MODULES_DIR};
use crate::cache::install::Installer;
use crate::cache::manifest::Manifest;
use crate::cache::transfer::ArtifactTransfer;
use crate::error::{NpmCacheError, NpmCacheResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Manifest file written by `install`; its presence marks the
/// workspace as populated
pub const MANIFEST_FILE: &str = "package.json";

/// An ephemeral, exclusively owned working directory
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Allocate a fresh, uniquely named temporary directory
    pub fn create() -> NpmCacheResult<Self> {
        let dir = tempfile::Builder::new()
            .prefix("npm-cache")
            .tempdir()
            .map_err(NpmCacheError::WorkspaceCreate)?;

        let path = dir.path().to_path_buf();
        debug!("Created workspace {}", path.display());

        Ok(Self {
            path,
            dir: Some(dir),
        })
    }

    /// Workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `destroy` has run
    pub fn is_destroyed(&self) -> bool {
        self.dir.is_none()
    }

    fn live_path(&self) -> NpmCacheResult<&Path> {
        if self.is_destroyed() {
            return Err(NpmCacheError::WorkspaceDestroyed(self.path.clone()));
        }
        Ok(&self.path)
    }

    fn ensure_unpopulated(&self) -> NpmCacheResult<&Path> {
        let path = self.live_path()?;
        for marker in [MANIFEST_FILE, ARCHIVE_NAME] {
            let marker = path.join(marker);
            if marker.exists() {
                return Err(NpmCacheError::AlreadyPopulated(marker));
            }
        }
        Ok(path)
    }

    /// Write the manifest and run the install procedure in the workspace
    pub async fn install(&self, manifest: &Manifest, installer: &Installer) -> NpmCacheResult<()> {
        let path = self.ensure_unpopulated()?;
        let manifest_path = path.join(MANIFEST_FILE);

        tokio::fs::write(&manifest_path, manifest.text())
            .await
            .map_err(|e| NpmCacheError::io(format!("writing {}", manifest_path.display()), e))?;

        installer.run(path).await
    }

    /// Download the archive at `source_url` into the workspace and
    /// unpack it into `target`
    pub async fn extract(
        &self,
        source_url: &str,
        target: &Path,
        transfer: &ArtifactTransfer<'_>,
    ) -> NpmCacheResult<()> {
        let path = self.ensure_unpopulated()?;
        let archive = path.join(ARCHIVE_NAME);

        let size = transfer.download(source_url, &archive).await?;
        info!("Downloaded cached modules ({} bytes)", size);

        let target = target.to_path_buf();
        tokio::task::spawn_blocking(move || unpack_modules(&archive, &target))
            .await
            .map_err(|e| NpmCacheError::Internal(format!("extract task failed: {}", e)))?
    }

    /// Pack the installed `node_modules` into `node_modules.tar.gz`
    /// inside the workspace and return its path
    pub async fn export_tar(&self) -> NpmCacheResult<PathBuf> {
        let path = self.live_path()?.to_path_buf();
        if !path.join(MODULES_DIR).is_dir() {
            return Err(NpmCacheError::NothingToExport(path));
        }

        let archive = path.join(ARCHIVE_NAME);
        let dest = archive.clone();
        tokio::task::spawn_blocking(move || pack_modules(&path, &dest))
            .await
            .map_err(|e| NpmCacheError::Internal(format!("export task failed: {}", e)))??;

        Ok(archive)
    }

    /// Remove the workspace, logging instead of failing
    pub fn destroy(&mut self) {
        if let Err(e) = self.destroy_strict() {
            warn!("{}", e);
        }
    }

    /// Remove the workspace, propagating removal failures
    pub fn destroy_strict(&mut self) -> NpmCacheResult<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };

        debug!("Removing workspace {}", self.path.display());
        match dir.close() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NpmCacheError::WorkspaceRemove {
                path: self.path.clone(),
                source: e,
            }),
        }
    }
}

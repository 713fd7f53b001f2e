//! Package manifest handling
//!
//! The raw text is the cache identity. The parsed form is only used to
//! apply [`ManifestPolicy`] rewrites before hashing and installing.

use crate::error::{NpmCacheError, NpmCacheResult};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{debug, info};

/// Manifest sections holding `name -> version specifier` maps
pub const DEPENDENCY_SECTIONS: &[&str] = &[
    "dependencies",
    "devDependencies",
    "optionalDependencies",
    "peerDependencies",
];

/// Specifier prefixes that point at the local filesystem
const LOCAL_PREFIXES: &[&str] = &["./", "../", "/", "~/", "file:"];

/// How a manifest is rewritten before it is hashed and installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestPolicy {
    /// Use the manifest exactly as read
    #[default]
    Verbatim,
    /// Drop dependencies whose specifier is a local path.
    ///
    /// Such dependencies cannot resolve inside a scratch workspace, so a
    /// repository that uses them only becomes cacheable once they are
    /// removed. This changes both the key and the installed set.
    StripLocalPaths,
}

impl ManifestPolicy {
    /// Policy selected by a boolean flag
    pub fn from_flag(strip_local_deps: bool) -> Self {
        if strip_local_deps {
            Self::StripLocalPaths
        } else {
            Self::Verbatim
        }
    }
}

/// Whether a version specifier refers to a local path
pub fn is_local_specifier(spec: &str) -> bool {
    let spec = spec.trim();
    spec == "." || spec == ".." || LOCAL_PREFIXES.iter().any(|p| spec.starts_with(p))
}

/// A dependency manifest (`package.json`)
#[derive(Debug, Clone)]
pub struct Manifest {
    text: String,
    value: Value,
}

impl Manifest {
    /// Parse manifest text; the document must be a JSON object
    pub fn parse(text: impl Into<String>) -> NpmCacheResult<Self> {
        let text = text.into();
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| NpmCacheError::ManifestInvalid(e.to_string()))?;

        if !value.is_object() {
            return Err(NpmCacheError::ManifestInvalid(
                "top level must be a JSON object".to_string(),
            ));
        }

        Ok(Self { text, value })
    }

    /// Read and parse a manifest from disk
    pub async fn read(path: &Path) -> NpmCacheResult<Self> {
        if !path.is_file() {
            return Err(NpmCacheError::ManifestNotFound(path.to_path_buf()));
        }

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| NpmCacheError::io(format!("reading manifest {}", path.display()), e))?;

        Self::parse(text)
    }

    /// Apply a rewrite policy.
    ///
    /// When the policy removes anything, the text becomes the compact
    /// serialization of the rewritten document; otherwise the original
    /// text is kept byte for byte.
    pub fn apply(self, policy: ManifestPolicy) -> NpmCacheResult<Self> {
        match policy {
            ManifestPolicy::Verbatim => Ok(self),
            ManifestPolicy::StripLocalPaths => self.strip_local_paths(),
        }
    }

    fn strip_local_paths(mut self) -> NpmCacheResult<Self> {
        let mut removed = Vec::new();

        if let Some(root) = self.value.as_object_mut() {
            for section in DEPENDENCY_SECTIONS {
                if let Some(Value::Object(deps)) = root.get_mut(*section) {
                    removed.extend(strip_section(deps));
                }
            }
        }

        if removed.is_empty() {
            return Ok(self);
        }

        info!("Dropping local path dependencies: {}", removed.join(", "));
        let text = serde_json::to_string(&self.value)?;
        Ok(Self {
            text,
            value: self.value,
        })
    }

    /// Text used for hashing and written into the workspace
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Names declared in any dependency section
    pub fn dependency_names(&self) -> Vec<&str> {
        DEPENDENCY_SECTIONS
            .iter()
            .filter_map(|section| self.value.get(*section).and_then(Value::as_object))
            .flat_map(|deps| deps.keys().map(String::as_str))
            .collect()
    }
}

fn strip_section(deps: &mut Map<String, Value>) -> Vec<String> {
    let local: Vec<String> = deps
        .iter()
        .filter(|(_, spec)| spec.as_str().is_some_and(is_local_specifier))
        .map(|(name, _)| name.clone())
        .collect();

    for name in &local {
        debug!("Removing local dependency {}", name);
        deps.remove(name);
    }

    local
}

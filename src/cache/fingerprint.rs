//! Cache key derivation
//!
//! A namespace key is `<prefix>.<platform-signature>.<manifest-hash>`.
//! Same manifest text on the same platform = same key.

use crate::error::{NpmCacheError, NpmCacheResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Identifies runtime version, OS and CPU architecture.
///
/// Modules built under one signature are assumed usable under any
/// other installation with the same signature. Computed once per
/// process and handed to [`fingerprint`] explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlatformSignature(String);

impl PlatformSignature {
    /// Build a signature from a runtime version (`v18.17.0` or `18.17.0`)
    /// plus OS type and architecture names.
    pub fn new(runtime_version: &str, os_type: &str, arch: &str) -> NpmCacheResult<Self> {
        let raw = runtime_version.trim();
        let version = semver::Version::parse(raw.trim_start_matches('v'))
            .map_err(|e| NpmCacheError::RuntimeVersion(format!("{}: {}", raw, e)))?;

        let signature = format!(
            "node-v{}-{}.{}-{}",
            version.major, version.minor, os_type, arch
        )
        .to_lowercase();

        Ok(Self(signature))
    }

    /// Signature for this host, asking the runtime for its version
    pub async fn detect(node_command: &str) -> NpmCacheResult<Self> {
        let output = Command::new(node_command)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|e| NpmCacheError::command_failed(format!("{} --version", node_command), e))?;

        if !output.status.success() {
            return Err(NpmCacheError::RuntimeVersion(format!(
                "{} --version exited with {}",
                node_command, output.status
            )));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        let signature = Self::new(&version, host_os_type(), host_arch())?;
        debug!("Platform signature: {}", signature);
        Ok(signature)
    }

    /// The signature string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlatformSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// OS type using the runtime's own names, so keys match caches
/// published by other clients on the same platform.
pub fn host_os_type() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        "windows" => "windows_nt",
        "solaris" | "illumos" => "sunos",
        other => other,
    }
}

/// CPU architecture using the runtime's own names
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "powerpc64" => "ppc64",
        "loongarch64" => "loong64",
        other => other,
    }
}

/// 128-bit content hash of the trimmed manifest text (first 32 hex
/// chars of SHA256)
pub fn manifest_hash(manifest_text: &str) -> String {
    let digest = Sha256::digest(manifest_text.trim().as_bytes());
    hex::encode(&digest[..16])
}

/// Compose the namespace key for a manifest
pub fn fingerprint(manifest_text: &str, namespace: &str, signature: &PlatformSignature) -> String {
    format!("{}.{}.{}", namespace, signature, manifest_hash(manifest_text))
}

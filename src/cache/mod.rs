//! Content-addressed cache of installed module trees
//!
//! Installed `node_modules` trees are published as task artifacts and
//! found again through the namespace index. Keys are derived from the
//! manifest text and the platform signature.
//!
//! # Key layout
//!
//! `<namespace>.node-v<major>-<minor>.<os>-<arch>.<manifest-hash>`
//!
//! # Publication order
//!
//! | Step | Effect |
//! |------|--------|
//! | install | `node_modules` populated in a workspace |
//! | export | `node_modules.tar.gz` written |
//! | upload | artifact readable from the store |
//! | register | key visible in the index |
//!
//! Registration always comes last, so a key found in the index always
//! points at a fully uploaded artifact.

pub mod archive;
pub mod fingerprint;
pub mod index;
pub mod install;
pub mod manifest;
pub mod transfer;
pub mod workspace;

pub use fingerprint::{fingerprint, manifest_hash, PlatformSignature};
pub use index::{CacheIndex, Lookup};
pub use install::Installer;
pub use manifest::{Manifest, ManifestPolicy};
pub use transfer::ArtifactTransfer;
pub use workspace::Workspace;

//! Error types for npm-cache
//!
//! All modules use `NpmCacheResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for npm-cache operations
pub type NpmCacheResult<T> = Result<T, NpmCacheError>;

/// Coarse classification of a failed remote service call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    /// The addressed resource does not exist (HTTP 404)
    NotFound,
    /// The service refused a write because the resource already exists
    Conflict,
    /// Anything else: network, auth, server errors
    Other,
}

impl ServiceErrorKind {
    /// Classify an HTTP status code
    pub fn from_status(status: u16) -> Self {
        match status {
            404 => Self::NotFound,
            409 => Self::Conflict,
            _ => Self::Other,
        }
    }
}

/// All errors that can occur in npm-cache
#[derive(Error, Debug)]
pub enum NpmCacheError {
    // Validation errors
    #[error("Invalid task {task_id}: {reason}")]
    Validation { task_id: String, reason: String },

    #[error("Manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Invalid manifest: {0}")]
    ManifestInvalid(String),

    #[error("Unrecognized runtime version: {0}")]
    RuntimeVersion(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // Remote service errors
    #[error("{service} request failed: {reason}")]
    Service {
        service: &'static str,
        kind: ServiceErrorKind,
        reason: String,
    },

    #[error("Download of {url} failed: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("No cached modules for {0}")]
    CacheMiss(String),

    // Workspace errors
    #[error("Failed to create workspace: {0}")]
    WorkspaceCreate(#[source] std::io::Error),

    #[error("Failed to remove workspace {path}: {source}")]
    WorkspaceRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Workspace already destroyed: {0}")]
    WorkspaceDestroyed(PathBuf),

    #[error("Cannot populate workspace twice ({0} exists)")]
    AlreadyPopulated(PathBuf),

    #[error("No modules to export (node_modules missing in {0})")]
    NothingToExport(PathBuf),

    // Archive errors
    #[error("Failed to create archive {path}: {reason}")]
    ArchiveCreate { path: PathBuf, reason: String },

    #[error("Failed to extract archive {path}: {reason}")]
    ExtractFailed { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Install failed: {command}, exit code: {code}{output}")]
    InstallFailed {
        command: String,
        code: i32,
        output: String,
    },

    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NpmCacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a remote service error
    pub fn service(service: &'static str, kind: ServiceErrorKind, reason: impl Into<String>) -> Self {
        Self::Service {
            service,
            kind,
            reason: reason.into(),
        }
    }

    /// Create a task validation error
    pub fn validation(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a remote "not found" response
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Service {
                kind: ServiceErrorKind::NotFound,
                ..
            }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Validation { .. } => {
                Some("The task must define extra.npmCache.url and a future extra.npmCache.expires")
            }
            Self::RuntimeVersion(_) => Some("Check that node is installed and on PATH"),
            Self::CacheMiss(_) => Some("Run without --no-fallback to install locally"),
            Self::CommandFailed { .. } => Some("Check that npm is installed and on PATH"),
            Self::Service {
                kind: ServiceErrorKind::Other,
                ..
            } => Some("Use --proxy when running inside a worker with the service proxy"),
            _ => None,
        }
    }
}

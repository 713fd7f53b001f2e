//! Wire types shared by the queue and index services

use crate::error::{NpmCacheError, NpmCacheResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A task definition; only the parts npm-cache reads are modeled
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawNpmCacheExtra {
    url: Option<String>,
    expires: Option<DateTime<Utc>>,
}

/// The validated `extra.npmCache` section of a caching task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmCacheExtra {
    /// Where to fetch the manifest from
    pub url: String,
    /// Expiry for the artifact and the index entry
    pub expires: DateTime<Utc>,
}

impl NpmCacheExtra {
    /// Extract and validate `extra.npmCache` from a task.
    ///
    /// Both fields are required and `expires` must lie after `now`.
    pub fn from_task(task_id: &str, task: &Task, now: DateTime<Utc>) -> NpmCacheResult<Self> {
        let section = task
            .extra
            .as_ref()
            .and_then(|extra| extra.get("npmCache"))
            .ok_or_else(|| NpmCacheError::validation(task_id, "task must contain extra.npmCache"))?;

        let raw: RawNpmCacheExtra = serde_json::from_value(section.clone()).map_err(|e| {
            NpmCacheError::validation(task_id, format!("malformed extra.npmCache: {}", e))
        })?;

        let url = raw
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| NpmCacheError::validation(task_id, "extra.npmCache.url is required"))?;

        let expires = raw
            .expires
            .ok_or_else(|| NpmCacheError::validation(task_id, "extra.npmCache.expires is required"))?;

        if expires <= now {
            return Err(NpmCacheError::validation(
                task_id,
                format!("extra.npmCache.expires ({}) is not in the future", expires.to_rfc3339()),
            ));
        }

        Ok(Self { url, expires })
    }
}

/// Body of a create-artifact call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRequest {
    pub storage_type: String,
    pub expires: DateTime<Utc>,
    pub content_type: String,
}

/// Write target returned by a create-artifact call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactTarget {
    pub put_url: String,
}

/// An index lookup result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexedTask {
    #[serde(default)]
    pub namespace: Option<String>,
    pub task_id: String,
    #[serde(default)]
    pub rank: i64,
    #[serde(default)]
    pub data: Value,
    pub expires: DateTime<Utc>,
}

/// An index insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub task_id: String,
    pub rank: i64,
    pub data: Value,
    pub expires: DateTime<Utc>,
}

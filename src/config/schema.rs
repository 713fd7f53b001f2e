//! Configuration schema for npm-cache
//!
//! Configuration is stored at `~/.config/npm-cache/config.toml`

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Remote service endpoints
    pub services: ServicesConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Package manager invocation
    pub install: InstallConfig,

    /// Cache key settings
    pub cache: CacheConfig,
}

impl Config {
    /// Reject values the loader cannot act on
    pub fn validate(&self) -> Result<(), String> {
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        if self.install.command.trim().is_empty() {
            return Err("install.command must not be empty".to_string());
        }
        if self.install.node_command.trim().is_empty() {
            return Err("install.node_command must not be empty".to_string());
        }
        if self.cache.namespace.trim().is_empty() {
            return Err("cache.namespace must not be empty".to_string());
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Overall deadline for one put/get run in seconds (0 = none)
    pub timeout_secs: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            timeout_secs: 3600,
        }
    }
}

/// Base URLs of the queue and index services
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    /// Queue service (tasks and artifacts)
    pub queue_url: String,

    /// Index service (namespace lookups)
    pub index_url: String,

    /// Queue service as seen through the worker's service proxy
    pub proxy_queue_url: String,

    /// Index service as seen through the worker's service proxy
    pub proxy_index_url: String,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            queue_url: "https://queue.taskcluster.net/v1".to_string(),
            index_url: "https://index.taskcluster.net/v1".to_string(),
            proxy_queue_url: "http://taskcluster/queue/v1".to_string(),
            proxy_index_url: "http://taskcluster/index/v1".to_string(),
        }
    }
}

impl ServicesConfig {
    /// Pick the (queue, index) base URLs for the given proxy mode
    pub fn endpoints(&self, proxy: bool) -> (&str, &str) {
        if proxy {
            (&self.proxy_queue_url, &self.proxy_index_url)
        } else {
            (&self.queue_url, &self.index_url)
        }
    }
}

/// HTTP client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum number of redirects followed per request
    pub max_redirects: u32,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 300,
            max_redirects: 10,
        }
    }
}

/// Package manager invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallConfig {
    /// Package manager executable
    pub command: String,

    /// Arguments for the install procedure
    pub args: Vec<String>,

    /// Runtime executable queried for the platform signature
    pub node_command: String,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self {
            command: "npm".to_string(),
            args: vec!["install".to_string()],
            node_command: "node".to_string(),
        }
    }
}

/// Cache key settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Index namespace prefix
    pub namespace: String,

    /// Drop local path dependencies before hashing and installing
    pub strip_local_deps: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: "npm_cache".to_string(),
            strip_local_deps: false,
        }
    }
}

//! Configuration loading
//!
//! One TOML file, `<config_dir>/npm-cache/config.toml` unless a path is
//! given. Every section and key is optional; a missing file means
//! defaults.

pub mod schema;

pub use schema::Config;

use crate::error::{NpmCacheError, NpmCacheResult};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Locates and reads the configuration file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manager for `path`, or for the per-user default location
    pub fn locate(path: Option<PathBuf>) -> Self {
        Self {
            config_path: path.unwrap_or_else(Self::default_config_path),
        }
    }

    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("npm-cache")
            .join("config.toml")
    }

    /// Read, parse and check the configuration
    pub async fn load(&self) -> NpmCacheResult<Config> {
        let path = &self.config_path;
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", path.display());
                return Ok(Config::default());
            }
            Err(e) => {
                return Err(NpmCacheError::io(format!("reading config from {}", path.display()), e))
            }
        };

        let config = parse(path, &content)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

fn parse(path: &Path, content: &str) -> NpmCacheResult<Config> {
    let invalid = |reason: String| NpmCacheError::ConfigInvalid {
        path: path.to_path_buf(),
        reason,
    };

    let config: Config = toml::from_str(content).map_err(|e| invalid(e.to_string()))?;
    config.validate().map_err(invalid)?;
    Ok(config)
}

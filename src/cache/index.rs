//! Cache lookups and registrations against the namespace index

use crate::error::NpmCacheResult;
use crate::remote::{Index, IndexEntry, IndexedTask};
use tracing::{debug, info};

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// An entry exists for the key
    Hit(IndexedTask),
    /// The index has no entry for the key
    Miss,
}

/// Index client for cache keys.
///
/// Only a not-found response is turned into [`Lookup::Miss`]. Every
/// other failure propagates: treating an outage as a miss costs a
/// rebuild, treating it as a hit would serve a missing artifact.
pub struct CacheIndex<'a> {
    index: &'a dyn Index,
}

impl<'a> CacheIndex<'a> {
    pub fn new(index: &'a dyn Index) -> Self {
        Self { index }
    }

    /// Look up a namespace key
    pub async fn lookup(&self, key: &str) -> NpmCacheResult<Lookup> {
        match self.index.find_task(key).await {
            Ok(task) => {
                info!("Cache hit for {} (task {})", key, task.task_id);
                Ok(Lookup::Hit(task))
            }
            Err(e) if e.is_not_found() => {
                info!("Cache miss for {}", key);
                Ok(Lookup::Miss)
            }
            Err(e) => Err(e),
        }
    }

    /// Register a new entry for a namespace key
    pub async fn register(&self, key: &str, entry: &IndexEntry) -> NpmCacheResult<()> {
        debug!("Registering {} -> task {}", key, entry.task_id);
        self.index.insert_task(key, entry).await?;
        info!("Registered {}", key);
        Ok(())
    }
}

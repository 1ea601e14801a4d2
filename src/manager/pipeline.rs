//! Compute-and-store shared by request threads and the refresh scheduler.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::{FillPolicy, ManagerError};
use crate::cache::CacheStore;
use crate::core::{CacheEntry, CacheKey};
use crate::fingerprint::FingerprintCreator;
use crate::model::ModelSource;
use crate::processor::GroupProcessor;
use crate::{debug, log};

/// Listener fired before every scheduled refresh pass.
pub type CacheChangeCallback = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct Pipeline {
    pub(crate) model: Arc<dyn ModelSource>,
    pub(crate) cache: Arc<dyn CacheStore<CacheKey, CacheEntry>>,
    pub(crate) processor: Arc<dyn GroupProcessor>,
    pub(crate) fingerprint: Arc<dyn FingerprintCreator>,
    pub(crate) policy: Arc<dyn FillPolicy>,
    pub(crate) callback: RwLock<Option<CacheChangeCallback>>,
}

impl Pipeline {
    /// Run the group processor for `key` and wrap the result.
    pub(crate) fn compute(&self, key: &CacheKey) -> Result<CacheEntry, ManagerError> {
        let model = self.model.model()?;
        let group = model
            .group(&key.group)
            .ok_or_else(|| ManagerError::NotFound(format!("group `{}`", key.group)))?;

        let content = self
            .processor
            .process(group, key.kind, key.minimize)
            .map_err(|source| ManagerError::Build {
                key: key.to_string(),
                source,
            })?;

        Ok(match content {
            Some(content) => {
                let fingerprint = self.fingerprint.create(&content);
                CacheEntry::new(content, fingerprint)
            }
            None => CacheEntry::empty(),
        })
    }

    /// Compute `key` and overwrite whatever is cached.
    pub(crate) fn compute_and_store(&self, key: &CacheKey) -> Result<CacheEntry, ManagerError> {
        let entry = self.compute(key)?;
        self.cache.put(key.clone(), entry.clone());
        Ok(entry)
    }

    /// Fill a missed `key` through the configured policy.
    pub(crate) fn fill(&self, key: &CacheKey) -> Result<CacheEntry, ManagerError> {
        debug!("cache"; "miss {}", key);
        self.policy.fill(key, self.cache.as_ref(), &|| self.compute(key))
    }

    /// Rebuild every `(group, type, minimize)` the model defines.
    ///
    /// A failing key is logged and skipped. Returns the number of keys rebuilt.
    pub(crate) fn refresh_all(&self, cancelled: &AtomicBool) -> Result<usize, ManagerError> {
        if let Some(callback) = self.callback.read().clone() {
            callback();
        }

        let model = self.model.model()?;
        let mut rebuilt = 0;
        for group in model.groups() {
            for kind in group.kinds() {
                for minimize in [true, false] {
                    if cancelled.load(Ordering::Acquire) {
                        return Ok(rebuilt);
                    }
                    let key = CacheKey::new(group.name.as_str(), kind, minimize);
                    match self.compute_and_store(&key) {
                        Ok(_) => rebuilt += 1,
                        Err(err) => log!("error"; "refresh {}: {}", key, err.describe()),
                    }
                }
            }
        }
        debug!("scheduler"; "refreshed {} cache entries", rebuilt);
        Ok(rebuilt)
    }
}

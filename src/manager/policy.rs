//! How a cache miss is filled.
//!
//! [`Unsynchronized`] lets concurrent misses on one key each run the build
//! and store the result; the last write wins. Builds are a pure function of
//! the key, so this only costs duplicate work. [`SingleFlight`] serializes
//! misses per key and lets waiters pick up the first builder's entry.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::ManagerError;
use crate::cache::CacheStore;
use crate::core::{CacheEntry, CacheKey};

/// Builds and stores the entry for a key that missed the cache.
pub trait FillPolicy: Send + Sync {
    fn fill(
        &self,
        key: &CacheKey,
        cache: &dyn CacheStore<CacheKey, CacheEntry>,
        build: &dyn Fn() -> Result<CacheEntry, ManagerError>,
    ) -> Result<CacheEntry, ManagerError>;
}

/// Build on the calling thread, no coordination.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unsynchronized;

impl FillPolicy for Unsynchronized {
    fn fill(
        &self,
        key: &CacheKey,
        cache: &dyn CacheStore<CacheKey, CacheEntry>,
        build: &dyn Fn() -> Result<CacheEntry, ManagerError>,
    ) -> Result<CacheEntry, ManagerError> {
        let entry = build()?;
        cache.put(key.clone(), entry.clone());
        Ok(entry)
    }
}

/// One build per key at a time.
#[derive(Debug, Default)]
pub struct SingleFlight {
    in_flight: DashMap<CacheKey, Arc<Mutex<()>>>,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FillPolicy for SingleFlight {
    fn fill(
        &self,
        key: &CacheKey,
        cache: &dyn CacheStore<CacheKey, CacheEntry>,
        build: &dyn Fn() -> Result<CacheEntry, ManagerError>,
    ) -> Result<CacheEntry, ManagerError> {
        let lock = Arc::clone(&*self.in_flight.entry(key.clone()).or_default());

        let result = {
            let _guard = lock.lock();
            match cache.get(key) {
                Some(entry) => Ok(entry),
                None => build().inspect(|entry| cache.put(key.clone(), entry.clone())),
            }
        };

        // Map + our clone: nobody else is waiting.
        self.in_flight
            .remove_if(key, |_, l| Arc::strong_count(l) <= 2);
        result
    }
}

//! In-memory LRU store.

use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};

use ::lru::LruCache;
use parking_lot::Mutex;

use super::{CacheStore, DEFAULT_CAPACITY};

/// Fixed-capacity store evicting the least-recently-used entry.
///
/// One mutex guards the whole map: `get` reorders recency, so even reads
/// mutate, and a single lock keeps every operation (including `clear`)
/// atomic with respect to the others.
pub struct LruStore<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, V>>,
    destroyed: AtomicBool,
}

impl<K: Hash + Eq, V> LruStore<K, V> {
    /// Create a store holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

impl<K: Hash + Eq, V> Default for LruStore<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<K, V> CacheStore<K, V> for LruStore<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn get(&self, key: &K) -> Option<V> {
        self.entries.lock().get(key).cloned()
    }

    fn put(&self, key: K, value: V) {
        // A destroyed store stays empty; writes from a straggling
        // scheduler pass are dropped.
        if self.is_destroyed() {
            return;
        }
        // `push` evicts at most one entry, never the key being inserted.
        self.entries.lock().push(key, value);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
        self.entries.lock().clear();
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

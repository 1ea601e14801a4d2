//! Bounded cache for merged group output.
//!
//! The [`CacheStore`] trait is the seam the manager talks to; [`LruStore`]
//! is the in-memory implementation used by default.

mod memory;

pub use memory::LruStore;

use std::hash::Hash;

/// Default number of entries kept before eviction starts.
pub const DEFAULT_CAPACITY: usize = 128;

/// Thread-safe key → value store.
///
/// Implementations own their synchronization: request threads and the
/// background scheduler call into the same store concurrently, and every
/// single-key operation must be linearizable.
pub trait CacheStore<K, V>: Send + Sync
where
    K: Eq + Hash,
{
    /// Look up `key`, marking it most-recently-used on hit.
    fn get(&self, key: &K) -> Option<V>;

    /// Insert or replace `key`, marking it most-recently-used.
    fn put(&self, key: K, value: V);

    /// Drop every entry in one step.
    fn clear(&self);

    /// Release resources. Later calls must not corrupt state.
    fn destroy(&self);

    /// Number of entries currently held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

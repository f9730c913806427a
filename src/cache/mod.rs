//! Cache Module
//!
//! Provides concurrent in-memory caching with TTL expiration, cost-bounded
//! frequency-aware admission, and tag-based bulk invalidation.

mod buffer;
mod entry;
mod metrics;
mod policy;
mod shards;
mod sketch;
mod store;
mod tags;
mod worker;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use metrics::MetricsSnapshot;
pub use store::BoundedStore;
pub use tags::TagIndex;

use std::time::Duration;

use crate::config::Config;
use crate::error::Result;

// == Cache ==
/// Concurrent in-memory cache with per-entry TTL, a global cost budget, and
/// tag-based bulk invalidation.
///
/// The cache pairs a [`BoundedStore`] with a [`TagIndex`]. Values are
/// opaque to it; choose `V` freely, or use `Arc<dyn Any + Send + Sync>`
/// when one cache must hold values of different types.
///
/// `set` and `set_tags` are two independent calls with no atomicity across
/// them: an invalidation may interleave between a key's set and its
/// tagging, and a reader may observe a value whose tags are not attached
/// yet. Callers that need the pair to be atomic must serialize externally.
#[derive(Debug)]
pub struct Cache<V> {
    store: BoundedStore<V>,
    tags: TagIndex,
}

impl<V: Clone + Send + Sync + 'static> Cache<V> {
    // == Constructor ==
    /// Creates a cache from `config`, spawning its write worker on the
    /// current tokio runtime.
    ///
    /// # Returns
    /// - `Err` if the configuration is invalid; construction is the only
    ///   operation that can fail
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            store: BoundedStore::new(config)?,
            tags: TagIndex::new(),
        })
    }

    /// Creates a cache with the default production sizing.
    pub fn with_defaults() -> Result<Self> {
        Self::new(&Config::default())
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Best-effort: a brand-new key becomes visible only after the write
    /// worker admits it, and may be rejected or dropped instead. Replacing
    /// a resident key takes effect immediately. See
    /// [`BoundedStore::set`] for the details.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        self.store.set(key, value, ttl);
    }

    // == Get ==
    /// Retrieves the value for `key` if it is resident and unexpired.
    pub fn get(&self, key: &str) -> Option<V> {
        self.store.get(key)
    }

    // == Delete ==
    /// Removes `key` if present. Tag associations pointing at it become
    /// stale references, which later invalidations skip harmlessly.
    pub fn delete(&self, key: &str) {
        self.store.delete(key);
    }

    // == Set Tags ==
    /// Associates `key` with each of `tags` for later bulk invalidation.
    ///
    /// The association is accepted even when the store does not currently
    /// hold the key, whether because admission is still pending, the entry
    /// was rejected, or it never existed.
    pub fn set_tags(&self, key: &str, tags: &[&str]) {
        self.tags.add(key, tags);
    }

    // == Invalidate Tags ==
    /// Deletes every key associated with any of `tags` and drops those tags
    /// from the index. Unknown tags are ignored; invalidating twice is a
    /// no-op the second time.
    pub fn invalidate_tags(&self, tags: &[&str]) {
        let keys = self.tags.take(tags);
        // Deletions run after the tag lock is released.
        for key in keys {
            self.store.delete(&key);
        }
    }

    // == Wait ==
    /// Resolves once every previously submitted write has been applied.
    /// After `wait` returns, a set that was neither rejected nor dropped is
    /// observable.
    pub async fn wait(&self) {
        self.store.wait().await;
    }

    // == Clear ==
    /// Discards every entry, every tag association, all policy state, and
    /// the metrics.
    pub async fn clear(&self) {
        self.tags.clear();
        self.store.clear().await;
    }

    // == Introspection ==
    /// Returns a snapshot of the performance counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.store.metrics()
    }

    /// Number of resident entries, counting expired entries not yet
    /// reclaimed.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    /// Returns true when no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

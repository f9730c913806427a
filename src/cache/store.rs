//! Bounded Store Module
//!
//! Cost-bounded concurrent key-value store: a sharded table on the read
//! path, buffered single-worker admission on the write path.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::cache::buffer::{AccessBuffer, AccessPush};
use crate::cache::entry::CacheEntry;
use crate::cache::metrics::{Metrics, MetricsSnapshot};
use crate::cache::policy::TinyLfuPolicy;
use crate::cache::shards::ShardedMap;
use crate::cache::worker::{self, WriteOp};
use crate::config::Config;
use crate::error::Result;

// == Constants ==
/// Cost charged per entry; the budget therefore bounds the entry count.
const ENTRY_COST: i64 = 1;

// == Key Hashing ==
/// Derives the primary and conflict hashes of a key from two independently
/// seeded hashers. The conflict hash is what keeps distinct keys that
/// collide on the primary hash from reading each other's values.
#[derive(Debug)]
struct KeyHasher {
    primary: RandomState,
    conflict: RandomState,
}

impl KeyHasher {
    fn new() -> Self {
        Self {
            primary: RandomState::new(),
            conflict: RandomState::new(),
        }
    }

    fn hash(&self, key: &str) -> (u64, u64) {
        (self.primary.hash_one(key), self.conflict.hash_one(key))
    }
}

// == Bounded Store ==
/// Concurrent key-value store enforcing a global cost budget and per-entry
/// TTL.
///
/// Reads go straight to the sharded table. Writes of brand-new keys are
/// buffered to a single background worker that consults the admission
/// policy, so they are best-effort: a set may be dropped under pressure or
/// rejected in favour of more frequently used keys, with no error either
/// way. Replacing a resident key bypasses admission and takes effect
/// immediately.
#[derive(Debug)]
pub struct BoundedStore<V> {
    shards: Arc<ShardedMap<V>>,
    metrics: Arc<Metrics>,
    hasher: KeyHasher,
    access_buffer: AccessBuffer,
    ops: mpsc::UnboundedSender<WriteOp<V>>,
    pending_inserts: Arc<AtomicUsize>,
    write_buffer_size: usize,
}

impl<V: Clone + Send + Sync + 'static> BoundedStore<V> {
    // == Constructor ==
    /// Creates a store and spawns its write worker on the current tokio
    /// runtime.
    ///
    /// # Arguments
    /// * `config` - Sizing parameters, validated before anything is spawned
    ///
    /// # Returns
    /// - `Err` if the configuration is invalid
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;

        let shards = Arc::new(ShardedMap::new());
        let metrics = Arc::new(Metrics::new());
        let pending_inserts = Arc::new(AtomicUsize::new(0));
        let (ops, ops_rx) = mpsc::unbounded_channel();
        let policy = TinyLfuPolicy::new(config.num_counters, config.max_cost);

        tokio::spawn(worker::run(
            ops_rx,
            Arc::clone(&shards),
            Arc::clone(&metrics),
            Arc::clone(&pending_inserts),
            policy,
        ));

        info!(
            num_counters = config.num_counters,
            max_cost = config.max_cost,
            "bounded store initialized"
        );

        Ok(Self {
            shards,
            metrics,
            hasher: KeyHasher::new(),
            access_buffer: AccessBuffer::new(config.buffer_items),
            ops,
            pending_inserts,
            write_buffer_size: config.write_buffer_size,
        })
    }

    // == Set ==
    /// Stores `value` under `key` for `ttl`.
    ///
    /// Replacing an existing key takes effect immediately. A brand-new key
    /// is queued for admission and becomes visible only once the worker
    /// accepts it, which is not guaranteed; use [`BoundedStore::wait`] when
    /// a set must be observable before reading.
    ///
    /// # Arguments
    /// * `key` - The key to store under
    /// * `value` - The value to store
    /// * `ttl` - Time to live; a zero TTL yields an entry that is never
    ///   visible
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let (hash, conflict) = self.hasher.hash(key);
        let entry = CacheEntry::new(conflict, value, ENTRY_COST, ttl);

        match self.shards.update(hash, entry) {
            // Replaced in place; the worker only refreshes cost bookkeeping.
            None => {
                let _ = self.ops.send(WriteOp::Update {
                    hash,
                    cost: ENTRY_COST,
                });
            }
            // Not resident: queue for admission, unless the write buffer is
            // already full, in which case the newest writer loses.
            Some(entry) => {
                if self.claim_insert_slot() {
                    let _ = self.ops.send(WriteOp::Insert { hash, entry });
                } else {
                    self.metrics.record_set_dropped();
                }
            }
        }
    }

    /// Reserves one slot in the write buffer. The bound is advisory; the
    /// worker decrements the counter as it applies inserts.
    fn claim_insert_slot(&self) -> bool {
        if self.pending_inserts.fetch_add(1, Ordering::Relaxed) >= self.write_buffer_size {
            self.pending_inserts.fetch_sub(1, Ordering::Relaxed);
            return false;
        }
        true
    }

    // == Get ==
    /// Retrieves the value for `key` if it is resident and unexpired.
    ///
    /// Every lookup, hit or miss, feeds the access buffer so the admission
    /// policy learns which keys are wanted. Expired entries are reported as
    /// misses and reclaimed lazily through the worker.
    ///
    /// # Arguments
    /// * `key` - The key to look up
    pub fn get(&self, key: &str) -> Option<V> {
        let (hash, conflict) = self.hasher.hash(key);
        self.record_access(hash);

        let Some(entry) = self.shards.get(hash, conflict) else {
            self.metrics.record_miss();
            return None;
        };

        if entry.is_expired() {
            // Lazy expiry: miss now, and ask the worker to reclaim exactly
            // the generation observed here.
            self.metrics.record_miss();
            let _ = self.ops.send(WriteOp::Remove {
                hash,
                conflict,
                expires_at: Some(entry.expires_at),
            });
            return None;
        }

        self.metrics.record_hit();
        Some(entry.value)
    }

    fn record_access(&self, hash: u64) {
        match self.access_buffer.push(hash) {
            AccessPush::Recorded => {}
            AccessPush::Flushed(batch) => {
                let _ = self.ops.send(WriteOp::Accesses(batch));
            }
            AccessPush::Contended => self.metrics.record_access_dropped(),
        }
    }

    // == Delete ==
    /// Removes `key` if present. Deleting an absent key is a no-op.
    pub fn delete(&self, key: &str) {
        let (hash, conflict) = self.hasher.hash(key);
        self.shards.remove(hash, Some(conflict), None);

        // The marker travels the same FIFO as queued inserts of this key,
        // so a delete issued after a set also wins after admission; it
        // releases the policy's cost tracking either way.
        let _ = self.ops.send(WriteOp::Remove {
            hash,
            conflict,
            expires_at: None,
        });
    }

    // == Wait ==
    /// Resolves once every operation submitted before the call has been
    /// applied by the write worker.
    pub async fn wait(&self) {
        let (ack, done) = oneshot::channel();
        if self.ops.send(WriteOp::Barrier(ack)).is_ok() {
            let _ = done.await;
        }
    }

    // == Clear ==
    /// Discards every entry and resets policy state and metrics, then waits
    /// for the reset to be applied.
    pub async fn clear(&self) {
        let _ = self.ops.send(WriteOp::Clear);
        self.wait().await;
    }

    // == Introspection ==
    /// Returns a snapshot of the performance counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of resident entries. Entries that expired but have not been
    /// reclaimed yet are still counted.
    pub fn len(&self) -> usize {
        self.shards.len()
    }

    /// Returns true when no entries are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn test_config() -> Config {
        Config {
            num_counters: 1024,
            max_cost: 100,
            buffer_items: 64,
            write_buffer_size: 1024,
        }
    }

    #[tokio::test]
    async fn test_set_then_get_after_wait() {
        let store = BoundedStore::new(&test_config()).unwrap();

        store.set("test:key", "value123".to_string(), Duration::from_secs(60));
        store.wait().await;

        assert_eq!(store.get("test:key"), Some("value123".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let store: BoundedStore<String> = BoundedStore::new(&test_config()).unwrap();

        assert_eq!(store.get("missing"), None);
        assert_eq!(store.metrics().misses, 1);
    }

    #[tokio::test]
    async fn test_overwrite_is_visible_immediately() {
        let store = BoundedStore::new(&test_config()).unwrap();

        store.set("key", "v1".to_string(), Duration::from_secs(60));
        store.wait().await;

        // No barrier needed: replacement of a resident key is synchronous.
        store.set("key", "v2".to_string(), Duration::from_secs(60));
        assert_eq!(store.get("key"), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let store = BoundedStore::new(&test_config()).unwrap();

        store.set("key", "value".to_string(), Duration::from_millis(10));
        store.wait().await;
        assert_eq!(store.get("key"), Some("value".to_string()));

        sleep(Duration::from_millis(20)).await;
        assert_eq!(store.get("key"), None);
    }

    #[tokio::test]
    async fn test_zero_ttl_is_never_visible() {
        let store = BoundedStore::new(&test_config()).unwrap();

        store.set("key", "value".to_string(), Duration::ZERO);
        store.wait().await;

        assert_eq!(store.get("key"), None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_reclaimed() {
        let store = BoundedStore::new(&test_config()).unwrap();

        store.set("key", "value".to_string(), Duration::from_millis(5));
        store.wait().await;
        assert_eq!(store.len(), 1);

        sleep(Duration::from_millis(15)).await;
        assert_eq!(store.get("key"), None);

        // The miss queued a reclamation marker; once it lands the entry and
        // its cost are gone.
        store.wait().await;
        assert_eq!(store.len(), 0);
        assert_eq!(store.metrics().cost_in_use, 0);
    }

    #[tokio::test]
    async fn test_delete_is_immediate_and_idempotent() {
        let store = BoundedStore::new(&test_config()).unwrap();

        store.set("key", "value".to_string(), Duration::from_secs(60));
        store.wait().await;

        store.delete("key");
        assert_eq!(store.get("key"), None);

        // Deleting again, and deleting something absent, are no-ops.
        store.delete("key");
        store.delete("never-set");
        store.wait().await;
        assert_eq!(store.len(), 0);
        assert_eq!(store.metrics().cost_in_use, 0);
    }

    #[tokio::test]
    async fn test_delete_after_set_wins() {
        let store = BoundedStore::new(&test_config()).unwrap();

        // Both operations are in flight together; FIFO order means the
        // delete lands after the insert it chases.
        store.set("key", "value".to_string(), Duration::from_secs(60));
        store.delete("key");
        store.wait().await;

        assert_eq!(store.get("key"), None);
        assert_eq!(store.metrics().cost_in_use, 0);
    }

    #[tokio::test]
    async fn test_budget_bounds_resident_entries() {
        let config = Config {
            max_cost: 10,
            ..test_config()
        };
        let store = BoundedStore::new(&config).unwrap();

        for i in 0..50 {
            store.set(&format!("key:{i}"), i, Duration::from_secs(60));
        }
        store.wait().await;

        assert!(store.len() <= 10);
        assert!(store.metrics().cost_in_use <= 10);
    }

    #[tokio::test]
    async fn test_full_write_buffer_drops_newest_sets() {
        let config = Config {
            write_buffer_size: 4,
            ..test_config()
        };
        let store = BoundedStore::new(&config).unwrap();

        // On the single-threaded test runtime the worker cannot drain the
        // queue between these calls, so exactly four sets fit.
        for i in 0..10 {
            store.set(&format!("key:{i}"), i, Duration::from_secs(60));
        }
        assert_eq!(store.metrics().sets_dropped, 6);

        store.wait().await;
        assert_eq!(store.len(), 4);
    }

    #[tokio::test]
    async fn test_metrics_track_hits_and_misses() {
        let store = BoundedStore::new(&test_config()).unwrap();

        store.set("key", "value".to_string(), Duration::from_secs(60));
        store.wait().await;

        store.get("key");
        store.get("key");
        store.get("missing");

        let metrics = store.metrics();
        assert_eq!(metrics.hits, 2);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.hit_rate, 2.0 / 3.0);
    }

    #[tokio::test]
    async fn test_clear_empties_store_and_metrics() {
        let store = BoundedStore::new(&test_config()).unwrap();

        for i in 0..5 {
            store.set(&format!("key:{i}"), i, Duration::from_secs(60));
        }
        store.wait().await;
        assert_eq!(store.len(), 5);

        store.clear().await;
        assert!(store.is_empty());
        assert_eq!(store.metrics(), MetricsSnapshot::default());

        // The store keeps working after a clear.
        store.set("key:0", 0, Duration::from_secs(60));
        store.wait().await;
        assert_eq!(store.get("key:0"), Some(0));
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = Config {
            max_cost: 0,
            ..test_config()
        };
        assert!(BoundedStore::<String>::new(&config).is_err());
    }
}

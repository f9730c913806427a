//! Sharded Table Module
//!
//! The authoritative hash-to-entry table, split across independently locked
//! shards so readers and writers touching different keys rarely contend.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cache::entry::CacheEntry;

// == Constants ==
/// Shard fanout; must be a power of two so the low hash bits select a shard.
const NUM_SHARDS: usize = 256;

// == Sharded Map ==
/// Fixed-fanout sharded hash table keyed by 64-bit key hash.
///
/// Every operation verifies the entry's conflict hash when the caller knows
/// it, so primary-hash collisions between distinct keys never surface the
/// wrong value. Expiry is not checked here; callers decide what an expired
/// entry means on their path.
#[derive(Debug)]
pub(crate) struct ShardedMap<V> {
    shards: Vec<RwLock<HashMap<u64, CacheEntry<V>>>>,
}

impl<V: Clone> ShardedMap<V> {
    pub fn new() -> Self {
        let mut shards = Vec::with_capacity(NUM_SHARDS);
        for _ in 0..NUM_SHARDS {
            shards.push(RwLock::new(HashMap::new()));
        }
        Self { shards }
    }

    fn shard(&self, hash: u64) -> &RwLock<HashMap<u64, CacheEntry<V>>> {
        &self.shards[(hash as usize) & (NUM_SHARDS - 1)]
    }

    // == Get ==
    /// Returns a clone of the entry for `hash` if its conflict hash matches.
    pub fn get(&self, hash: u64, conflict: u64) -> Option<CacheEntry<V>> {
        let shard = self.shard(hash).read();
        let entry = shard.get(&hash)?;
        if entry.conflict != conflict {
            return None;
        }
        Some(entry.clone())
    }

    // == Update ==
    /// Replaces the value and expiry of an already-resident entry in place.
    ///
    /// Returns the entry back to the caller when there is nothing to update,
    /// either because `hash` is absent or because the resident entry belongs
    /// to a different key (conflict mismatch).
    pub fn update(&self, hash: u64, entry: CacheEntry<V>) -> Option<CacheEntry<V>> {
        let mut shard = self.shard(hash).write();
        match shard.get_mut(&hash) {
            Some(existing) if existing.conflict == entry.conflict => {
                existing.value = entry.value;
                existing.expires_at = entry.expires_at;
                None
            }
            _ => Some(entry),
        }
    }

    // == Insert ==
    /// Stores `entry` under `hash`. Returns false without storing when the
    /// slot is held by an entry with a different conflict hash.
    pub fn insert(&self, hash: u64, entry: CacheEntry<V>) -> bool {
        let mut shard = self.shard(hash).write();
        if let Some(existing) = shard.get(&hash) {
            if existing.conflict != entry.conflict {
                return false;
            }
        }
        shard.insert(hash, entry);
        true
    }

    // == Remove ==
    /// Removes and returns the entry for `hash`.
    ///
    /// When `conflict` is given, only a matching entry is removed. When
    /// `if_expires_at` is given, removal additionally applies only to the
    /// entry generation carrying exactly that expiry; a fresher replacement
    /// stays put.
    pub fn remove(
        &self,
        hash: u64,
        conflict: Option<u64>,
        if_expires_at: Option<u64>,
    ) -> Option<CacheEntry<V>> {
        let mut shard = self.shard(hash).write();
        let entry = shard.get(&hash)?;
        if let Some(conflict) = conflict {
            if entry.conflict != conflict {
                return None;
            }
        }
        if let Some(expires_at) = if_expires_at {
            if entry.expires_at != expires_at {
                return None;
            }
        }
        shard.remove(&hash)
    }

    // == Clear ==
    /// Drops every entry in every shard.
    pub fn clear(&self) {
        for shard in &self.shards {
            shard.write().clear();
        }
    }

    // == Len ==
    /// Total number of resident entries, counted shard by shard.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }
}

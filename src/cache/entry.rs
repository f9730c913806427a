//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

// == Cache Entry ==
/// Represents a single cache entry with value and metadata.
///
/// Entries do not retain the original key string. The table addresses them
/// by the key's primary hash, and `conflict` holds a second, independently
/// seeded hash that lookups check so two keys colliding on the primary hash
/// cannot read each other's values.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
    /// Secondary hash of the key, verified on every lookup
    pub conflict: u64,
    /// The stored value
    pub value: V,
    /// Cost charged against the budget while the entry is resident
    pub cost: i64,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: u64,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry expiring `ttl` from now.
    ///
    /// # Arguments
    /// * `conflict` - Secondary hash of the key
    /// * `value` - The value to store
    /// * `cost` - Cost charged against the budget
    /// * `ttl` - Time to live, measured from now
    pub fn new(conflict: u64, value: V, cost: i64, ttl: Duration) -> Self {
        Self {
            conflict,
            value,
            cost,
            expires_at: expiry_timestamp(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is considered expired when the current
    /// time is greater than or equal to the expiration time. A zero TTL
    /// therefore produces an entry that is never visible.
    pub fn is_expired(&self) -> bool {
        current_timestamp_ms() >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub(crate) fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

/// Returns the absolute expiry timestamp for a TTL starting now.
pub(crate) fn expiry_timestamp(ttl: Duration) -> u64 {
    let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
    current_timestamp_ms().saturating_add(ttl_ms)
}

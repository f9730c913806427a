//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;

use crate::error::{CacheError, Result};

/// Cache configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of keys to keep frequency estimates for; should be roughly ten
    /// times the number of entries the cache is expected to hold at once
    pub num_counters: usize,
    /// Total cost budget; every entry costs 1, so this bounds the entry count
    pub max_cost: i64,
    /// Access records collected per stripe before a batch is handed to the
    /// admission policy
    pub buffer_items: usize,
    /// Maximum number of buffered inserts awaiting admission; newer sets are
    /// dropped once this many are in flight
    pub write_buffer_size: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `NUM_COUNTERS` - Keys tracked for frequency (default: 10000000)
    /// - `MAX_COST` - Total cost budget (default: 1073741824)
    /// - `BUFFER_ITEMS` - Access records per batch (default: 64)
    /// - `WRITE_BUFFER_SIZE` - Pending insert capacity (default: 32768)
    pub fn from_env() -> Self {
        Self {
            num_counters: env::var("NUM_COUNTERS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000_000),
            max_cost: env::var("MAX_COST")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1 << 30),
            buffer_items: env::var("BUFFER_ITEMS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(64),
            write_buffer_size: env::var("WRITE_BUFFER_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(32_768),
        }
    }

    /// Validates the configuration.
    ///
    /// Every parameter must be positive. An invalid configuration is fatal
    /// at construction time; there is no degraded mode.
    pub fn validate(&self) -> Result<()> {
        if self.num_counters == 0 {
            return Err(CacheError::InvalidNumCounters(self.num_counters));
        }
        if self.max_cost <= 0 {
            return Err(CacheError::InvalidMaxCost(self.max_cost));
        }
        if self.buffer_items == 0 {
            return Err(CacheError::InvalidBufferItems(self.buffer_items));
        }
        if self.write_buffer_size == 0 {
            return Err(CacheError::InvalidWriteBufferSize(self.write_buffer_size));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_counters: 10_000_000,
            max_cost: 1 << 30,
            buffer_items: 64,
            write_buffer_size: 32_768,
        }
    }
}

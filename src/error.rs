//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction.
///
/// Normal traffic never produces errors: admission rejection, expiry, and
/// deletion of absent keys are all silent outcomes. The only failure mode
/// is an invalid configuration, reported when the cache is built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// num_counters must be positive
    #[error("num_counters must be greater than zero (got {0})")]
    InvalidNumCounters(usize),

    /// max_cost must be positive
    #[error("max_cost must be greater than zero (got {0})")]
    InvalidMaxCost(i64),

    /// buffer_items must be positive
    #[error("buffer_items must be greater than zero (got {0})")]
    InvalidBufferItems(usize),

    /// write_buffer_size must be positive
    #[error("write_buffer_size must be greater than zero (got {0})")]
    InvalidWriteBufferSize(usize),
}

// == Result Type Alias ==
/// Convenience Result type for cache construction.
pub type Result<T> = std::result::Result<T, CacheError>;

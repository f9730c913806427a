//! Tagcache - a concurrent in-memory cache with tag-based invalidation
//!
//! Holds opaque values under per-entry TTL inside a global cost budget.
//! Admission is frequency-aware: when the budget is full, new entries must
//! be warmer than sampled residents to get in, so one pass of cold keys
//! cannot flush a working set. A secondary tag index maps tags to keys for
//! bulk invalidation.
//!
//! Writes of new keys are buffered and applied by a background worker;
//! they are best-effort and carry no completion signal. Call
//! [`Cache::wait`] when a write must be observable before reading.
//!
//! # Quick Start
//! ```
//! use std::time::Duration;
//! use tagcache::{Cache, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config {
//!         num_counters: 100_000,
//!         max_cost: 10_000,
//!         ..Config::default()
//!     };
//!     let cache: Cache<String> = Cache::new(&config).unwrap();
//!
//!     cache.set("user:1", "alice".to_string(), Duration::from_secs(60));
//!     cache.set_tags("user:1", &["users"]);
//!     cache.wait().await;
//!     assert_eq!(cache.get("user:1"), Some("alice".to_string()));
//!
//!     cache.invalidate_tags(&["users"]);
//!     assert_eq!(cache.get("user:1"), None);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{BoundedStore, Cache, MetricsSnapshot, TagIndex};
pub use config::Config;
pub use error::{CacheError, Result};

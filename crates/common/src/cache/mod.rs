//! Bounded TTL cache with configurable eviction policies
//!
//! Stores decoded API responses (or anything `Clone`) in memory so repeated
//! requests for the same resource skip the network.
//!
//! # Features
//!
//! - **Bounded**: never holds more than `max_size` entries; inserting a new
//!   key into a full cache evicts one entry first
//! - **TTL**: every entry expires `ttl` after it was set (per-entry override
//!   available); expired entries are never returned
//! - **Eviction policies**: LRU, LFU (insertion order breaks ties), FIFO
//! - **Active expiry**: an optional background sweeper purges entries nobody
//!   reads again
//! - **Thread-safe**: one `parking_lot::RwLock` per cache; clones share
//!   storage
//! - **Testable**: clock abstraction for deterministic time-based testing
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use figmagen_common::cache::{Cache, CacheConfig, EvictionPolicy};
//!
//! # fn main() -> Result<(), figmagen_common::CommonError> {
//! let config = CacheConfig::builder()
//!     .max_size(500)
//!     .ttl(Duration::from_secs(300))
//!     .eviction_policy("fifo".parse::<EvictionPolicy>()?)
//!     .build();
//!
//! let cache: Cache<String, String> = Cache::new(config)?;
//! cache.set("file:abc".to_string(), "{}".to_string(), None);
//! assert!(cache.has("file:abc"));
//!
//! let stats = cache.stats();
//! assert_eq!(stats.sets, 1);
//! # Ok(())
//! # }
//! ```

mod config;
mod core;
mod stats;
mod sweeper;

// Re-export public API
pub use core::{Cache, CacheEntry};

pub use config::{
    CacheConfig, CacheConfigBuilder, EvictionPolicy, DEFAULT_MAX_SIZE, DEFAULT_SWEEP_INTERVAL,
    DEFAULT_TTL, MAX_TTL,
};
pub use stats::CacheStats;
pub use sweeper::CacheSweeper;

//! Shared building blocks for the figmagen request governor.
//!
//! # Modules
//!
//! - `error`: the common error taxonomy and classification trait
//! - `cache`: bounded TTL cache with LRU/FIFO/LFU eviction and an active
//!   expiry sweeper
//! - `resilience`: clock abstraction, hybrid token-bucket/sliding-window rate
//!   limiter, the server-feedback adaptive variant and the per-key registry
//!
//! Everything here lives in process memory; nothing is persisted across
//! restarts.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod error;
pub mod resilience;

// Re-export commonly used types and traits for convenience
// ------------------------
pub use cache::{Cache, CacheConfig, CacheStats, EvictionPolicy};
pub use error::{CommonError, CommonResult, ErrorClassification, ErrorSeverity};
pub use resilience::{
    AdaptiveRateLimiter, Clock, LimiterRegistry, MockClock, Permit, RateLimiter,
    RateLimiterConfig, SystemClock, TokioClock,
};

//! Admission control for outbound requests
//!
//! - **Clock**: time abstraction shared with the cache (`SystemClock`,
//!   `TokioClock`, `MockClock`)
//! - **RateLimiter**: token bucket for bursts combined with a sliding window
//!   for sustained throughput
//! - **AdaptiveRateLimiter**: honors server retry hints after throttling
//!   responses
//! - **LimiterRegistry**: one shared limiter per resource key
//!
//! Limiters suspend callers with `tokio::time::sleep`; nothing here blocks a
//! thread.

mod adaptive;
mod clock;
pub mod rate_limiter;
mod registry;

pub use adaptive::{AdaptiveRateLimiter, DEFAULT_RETRY_HINT_HEADER};
pub use clock::{Clock, MockClock, SystemClock, TokioClock};
pub use rate_limiter::{
    LimitUpdate, LimiterStatus, Permit, RateLimiter, RateLimiterConfig, RateLimiterConfigBuilder,
    RateLimiterStats,
};
pub use registry::LimiterRegistry;

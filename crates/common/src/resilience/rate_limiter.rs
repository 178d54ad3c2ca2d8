//! Hybrid token-bucket / sliding-window rate limiter
//!
//! A request is admitted only when the bucket holds a token **and** the
//! trailing window has room. The bucket bounds bursts, the window bounds
//! sustained throughput:
//!
//! - **Token bucket**: holds at most `burst_limit` tokens and refills at
//!   `burst_limit` tokens per `window_size`, in whole tokens. The fractional
//!   remainder of elapsed time is carried forward, so frequent polling never
//!   slows the refill down.
//! - **Sliding window**: remembers the instant of every admission inside the
//!   trailing `window_size` and admits at most `requests_per_window` of them.
//!
//! When a request is rejected the limiter computes how long the caller must
//! wait (`max(next token, oldest window slot frees up, min_wait)`) and
//! [`RateLimiter::acquire`] sleeps for that long before trying again.
//!
//! # Examples
//!
//! ```rust
//! use std::time::Duration;
//!
//! use figmagen_common::resilience::{RateLimiter, RateLimiterConfig};
//!
//! # async fn example() -> Result<(), figmagen_common::CommonError> {
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::builder()
//!         .requests_per_window(60)
//!         .burst_limit(10)
//!         .window_size(Duration::from_secs(60))
//!         .build()?,
//! )?;
//!
//! let permit = limiter.acquire().await?;
//! assert!(permit.is_immediate());
//! # Ok(())
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use super::{Clock, TokioClock};
use crate::error::{CommonError, CommonResult};

/// Default requests admitted per window
pub const DEFAULT_REQUESTS_PER_WINDOW: u32 = 60;
/// Default bucket capacity
pub const DEFAULT_BURST_LIMIT: u32 = 10;
/// Default window length
pub const DEFAULT_WINDOW_SIZE: Duration = Duration::from_millis(60_000);
/// Lower bound applied to every computed rejection wait
pub const DEFAULT_MIN_WAIT: Duration = Duration::from_millis(100);

/// Configuration for [`RateLimiter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Maximum admissions inside any trailing `window_size`
    pub requests_per_window: u32,
    /// Bucket capacity, i.e. the largest burst admitted back to back
    pub burst_limit: u32,
    /// Length of the sliding window and of one full bucket refill
    pub window_size: Duration,
    /// Floor for every rejection wait
    pub min_wait: Duration,
    /// Give up after this many waits (`None` waits forever)
    pub max_wait_cycles: Option<u32>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_window: DEFAULT_REQUESTS_PER_WINDOW,
            burst_limit: DEFAULT_BURST_LIMIT,
            window_size: DEFAULT_WINDOW_SIZE,
            min_wait: DEFAULT_MIN_WAIT,
            max_wait_cycles: None,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new configuration builder
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> CommonResult<()> {
        if self.requests_per_window == 0 {
            return Err(CommonError::config_field(
                "requests_per_window",
                "must be greater than 0",
            ));
        }
        if self.burst_limit == 0 {
            return Err(CommonError::config_field("burst_limit", "must be greater than 0"));
        }
        if self.window_size.is_zero() {
            return Err(CommonError::config_field("window_size", "must be greater than zero"));
        }
        Ok(())
    }
}

/// Builder for RateLimiterConfig
#[derive(Debug, Default)]
pub struct RateLimiterConfigBuilder {
    config: RateLimiterConfig,
}

impl RateLimiterConfigBuilder {
    /// Create a builder starting from the defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the admissions allowed per rolling window
    pub fn requests_per_window(mut self, requests: u32) -> Self {
        self.config.requests_per_window = requests;
        self
    }

    /// Set the token bucket capacity
    pub fn burst_limit(mut self, burst: u32) -> Self {
        self.config.burst_limit = burst;
        self
    }

    /// Set the rolling window length
    pub fn window_size(mut self, window: Duration) -> Self {
        self.config.window_size = window;
        self
    }

    /// Set the floor applied to every rejection wait
    pub fn min_wait(mut self, min_wait: Duration) -> Self {
        self.config.min_wait = min_wait;
        self
    }

    /// Cap the rejection waits one `acquire` may sit through
    ///
    /// Unset means wait indefinitely.
    pub fn max_wait_cycles(mut self, cycles: u32) -> Self {
        self.config.max_wait_cycles = Some(cycles);
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> CommonResult<RateLimiterConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Partial reconfiguration applied through [`RateLimiter::update_limits`]
///
/// Fields left as `None` keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitUpdate {
    /// New admissions per window
    pub requests_per_window: Option<u32>,
    /// New bucket capacity; current tokens are clamped down to it
    pub burst_limit: Option<u32>,
    /// New window length
    pub window_size: Option<Duration>,
    /// New rejection wait floor
    pub min_wait: Option<Duration>,
}

/// Outcome of a successful [`RateLimiter::acquire`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    /// Total time spent suspended before admission
    pub waited: Duration,
    /// Number of rejection waits before admission
    pub wait_cycles: u32,
}

impl Permit {
    /// Whether the request was admitted without waiting
    pub fn is_immediate(&self) -> bool {
        self.wait_cycles == 0
    }
}

/// Counters describing limiter activity since creation or the last reset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimiterStats {
    /// Admission requests (`acquire` and `try_acquire` calls)
    pub total_requests: u64,
    /// Rejections, each one followed by a wait
    pub rejected_requests: u64,
    /// Sum of every rejection wait
    pub total_wait: Duration,
}

impl RateLimiterStats {
    /// Average wait across rejected requests only
    pub fn average_wait(&self) -> Duration {
        if self.rejected_requests == 0 {
            return Duration::ZERO;
        }
        let nanos = self.total_wait.as_nanos() / u128::from(self.rejected_requests);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Share of requests that had to wait
    pub fn rejection_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.rejected_requests as f64 / self.total_requests as f64
        }
    }
}

/// Point-in-time view of a limiter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterStatus {
    /// Whole tokens left in the bucket after refill
    pub available_tokens: u32,
    /// Admissions still inside the rolling window
    pub window_count: usize,
    /// Configured admissions per window
    pub requests_per_window: u32,
    /// Configured bucket capacity
    pub burst_limit: u32,
    /// Configured window length
    pub window_size: Duration,
    /// Projected wait for the next admission, zero when admissible now
    pub wait_time: Duration,
}

impl fmt::Display for LimiterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "tokens {}/{}, window {}/{} per {:?}, wait {:?}",
            self.available_tokens,
            self.burst_limit,
            self.window_count,
            self.requests_per_window,
            self.window_size,
            self.wait_time
        )
    }
}

#[derive(Debug)]
struct LimiterState {
    config: RateLimiterConfig,
    tokens: u32,
    last_refill: Instant,
    window: VecDeque<Instant>,
    last_activity: Instant,
}

impl LimiterState {
    fn new(config: RateLimiterConfig, now: Instant) -> Self {
        Self {
            tokens: config.burst_limit,
            window: VecDeque::with_capacity(config.requests_per_window.min(1024) as usize),
            config,
            last_refill: now,
            last_activity: now,
        }
    }

    /// Refill whole tokens and drop window entries that aged out
    fn advance(&mut self, now: Instant) {
        self.refill(now);
        self.prune(now);
    }

    fn refill(&mut self, now: Instant) {
        let burst = self.config.burst_limit;
        if self.tokens >= burst {
            self.tokens = burst;
            self.last_refill = now;
            return;
        }

        let elapsed = now.saturating_duration_since(self.last_refill);
        let window_nanos = self.config.window_size.as_nanos();
        let earned = elapsed.as_nanos() * u128::from(burst) / window_nanos;
        if earned == 0 {
            return;
        }

        let missing = burst - self.tokens;
        if earned >= u128::from(missing) {
            self.tokens = burst;
            self.last_refill = now;
        } else {
            // earned < missing <= u32::MAX
            let earned = earned as u32;
            self.tokens += earned;
            let consumed = u128::from(earned) * window_nanos / u128::from(burst);
            self.last_refill += duration_from_nanos(consumed);
        }
    }

    fn prune(&mut self, now: Instant) {
        let window = self.config.window_size;
        while let Some(&oldest) = self.window.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    fn admissible(&self) -> bool {
        self.tokens > 0 && self.window.len() < self.config.requests_per_window as usize
    }

    /// Wait until both the bucket and the window can admit again
    fn wait_time(&self, now: Instant) -> Duration {
        if self.admissible() {
            return Duration::ZERO;
        }

        let token_wait = if self.tokens > 0 {
            Duration::ZERO
        } else {
            let window_nanos = self.config.window_size.as_nanos();
            let burst = u128::from(self.config.burst_limit);
            let per_token = duration_from_nanos(window_nanos.div_ceil(burst));
            per_token.saturating_sub(now.saturating_duration_since(self.last_refill))
        };

        let window_wait = if self.window.len() < self.config.requests_per_window as usize {
            Duration::ZERO
        } else {
            self.window
                .front()
                .map(|&oldest| {
                    (oldest + self.config.window_size).saturating_duration_since(now)
                })
                .unwrap_or(Duration::ZERO)
        };

        token_wait.max(window_wait).max(self.config.min_wait)
    }

    fn status(&self, now: Instant) -> LimiterStatus {
        LimiterStatus {
            available_tokens: self.tokens,
            window_count: self.window.len(),
            requests_per_window: self.config.requests_per_window,
            burst_limit: self.config.burst_limit,
            window_size: self.config.window_size,
            wait_time: self.wait_time(now),
        }
    }
}

fn duration_from_nanos(nanos: u128) -> Duration {
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Hybrid token-bucket / sliding-window rate limiter
///
/// All state transitions happen under one mutex that is never held across
/// an `.await`. Waiters are not queued: whichever caller retries first after
/// capacity frees up is admitted.
pub struct RateLimiter<C: Clock = TokioClock> {
    state: Mutex<LimiterState>,
    total_requests: AtomicU64,
    rejected_requests: AtomicU64,
    total_wait_nanos: AtomicU64,
    clock: C,
}

impl RateLimiter<TokioClock> {
    /// Create a limiter driven by tokio's clock
    pub fn new(config: RateLimiterConfig) -> CommonResult<Self> {
        Self::with_clock(config, TokioClock)
    }
}

impl<C: Clock> fmt::Debug for RateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RateLimiter")
            .field("config", &state.config)
            .field("tokens", &state.tokens)
            .field("window_count", &state.window.len())
            .finish()
    }
}

impl<C: Clock> RateLimiter<C> {
    /// Create a limiter with a custom clock
    ///
    /// `acquire` sleeps on tokio's timer, so the clock must advance with it
    /// ([`TokioClock`] or [`super::SystemClock`]). A [`super::MockClock`] is
    /// only suitable for the non-suspending operations.
    pub fn with_clock(config: RateLimiterConfig, clock: C) -> CommonResult<Self> {
        config.validate()?;
        let now = clock.now();
        Ok(Self {
            state: Mutex::new(LimiterState::new(config, now)),
            total_requests: AtomicU64::new(0),
            rejected_requests: AtomicU64::new(0),
            total_wait_nanos: AtomicU64::new(0),
            clock,
        })
    }

    /// Suspend until a request is admitted
    ///
    /// Rejections are retried in a loop around `tokio::time::sleep`. Returns
    /// `RateLimitExceeded` only when `max_wait_cycles` is configured and
    /// exhausted.
    pub async fn acquire(&self) -> CommonResult<Permit> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let mut permit = Permit { waited: Duration::ZERO, wait_cycles: 0 };

        loop {
            let wait = match self.admit() {
                Ok(()) => return Ok(permit),
                Err(wait) => wait,
            };
            self.check_wait_budget(permit.wait_cycles, wait)?;

            self.record_rejection(wait);
            permit.wait_cycles += 1;
            permit.waited += wait;
            tokio::time::sleep(wait).await;
        }
    }

    /// Like [`acquire`](Self::acquire), but a pending wait is abandoned when
    /// `cancel` fires
    pub async fn acquire_with_cancel(&self, cancel: &CancellationToken) -> CommonResult<Permit> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        let mut permit = Permit { waited: Duration::ZERO, wait_cycles: 0 };

        loop {
            let wait = match self.admit() {
                Ok(()) => return Ok(permit),
                Err(wait) => wait,
            };
            self.check_wait_budget(permit.wait_cycles, wait)?;

            self.record_rejection(wait);
            permit.wait_cycles += 1;
            permit.waited += wait;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(waited_ms = permit.waited.as_millis() as u64, "Rate limiter wait cancelled");
                    return Err(CommonError::task_cancelled_with_reason(
                        "rate_limiter.acquire",
                        "cancelled while waiting for capacity",
                    ));
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// Single non-suspending admission attempt
    ///
    /// On rejection returns the wait the caller should honor before trying
    /// again; the rejection and its wait are counted in the stats.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.admit().inspect_err(|wait| self.record_rejection(*wait))
    }

    /// Whether a request would be admitted right now, without consuming
    /// capacity
    pub fn can_admit_now(&self) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.advance(now);
        state.admissible()
    }

    /// Projected wait for the next admission (zero if admissible now)
    pub fn wait_time(&self) -> Duration {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.advance(now);
        state.wait_time(now)
    }

    /// Snapshot of the activity counters
    pub fn stats(&self) -> RateLimiterStats {
        RateLimiterStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            rejected_requests: self.rejected_requests.load(Ordering::Relaxed),
            total_wait: Duration::from_nanos(self.total_wait_nanos.load(Ordering::Relaxed)),
        }
    }

    /// Refill the bucket, empty the window and zero the stats
    pub fn reset(&self) {
        let now = self.clock.now();
        {
            let mut state = self.state.lock();
            state.tokens = state.config.burst_limit;
            state.last_refill = now;
            state.window.clear();
            state.last_activity = now;
        }
        self.total_requests.store(0, Ordering::Relaxed);
        self.rejected_requests.store(0, Ordering::Relaxed);
        self.total_wait_nanos.store(0, Ordering::Relaxed);
        debug!("Rate limiter reset");
    }

    /// Apply a validated reconfiguration
    ///
    /// Shrinking `burst_limit` clamps the available tokens immediately;
    /// growing it never adds tokens.
    pub fn update_limits(&self, update: LimitUpdate) -> CommonResult<()> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.advance(now);

        let mut config = state.config.clone();
        if let Some(requests) = update.requests_per_window {
            config.requests_per_window = requests;
        }
        if let Some(burst) = update.burst_limit {
            config.burst_limit = burst;
        }
        if let Some(window) = update.window_size {
            config.window_size = window;
        }
        if let Some(min_wait) = update.min_wait {
            config.min_wait = min_wait;
        }
        config.validate()?;

        state.tokens = state.tokens.min(config.burst_limit);
        debug!(
            requests_per_window = config.requests_per_window,
            burst_limit = config.burst_limit,
            window_ms = config.window_size.as_millis() as u64,
            tokens = state.tokens,
            "Rate limits updated"
        );
        state.config = config;
        Ok(())
    }

    /// Current configuration
    pub fn config(&self) -> RateLimiterConfig {
        self.state.lock().config.clone()
    }

    /// Point-in-time view after refill and prune bookkeeping
    pub fn status(&self) -> LimiterStatus {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.advance(now);
        state.status(now)
    }

    /// Instant of the last admission attempt
    pub fn last_activity(&self) -> Instant {
        self.state.lock().last_activity
    }

    /// Clock driving this limiter
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Count a rejection and its wait without attempting admission
    pub(crate) fn record_rejection(&self, wait: Duration) {
        self.rejected_requests.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(wait.as_nanos()).unwrap_or(u64::MAX);
        self.total_wait_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    /// Atomic refill, prune and admission check
    fn admit(&self) -> Result<(), Duration> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.last_activity = now;
        state.advance(now);

        if state.admissible() {
            state.tokens -= 1;
            state.window.push_back(now);
            trace!(
                tokens = state.tokens,
                window_count = state.window.len(),
                "Request admitted"
            );
            Ok(())
        } else {
            let wait = state.wait_time(now);
            debug!(
                tokens = state.tokens,
                window_count = state.window.len(),
                wait_ms = wait.as_millis() as u64,
                "Request rejected, waiting for capacity"
            );
            Err(wait)
        }
    }

    fn check_wait_budget(&self, cycles: u32, wait: Duration) -> CommonResult<()> {
        let config = self.config();
        match config.max_wait_cycles {
            Some(max) if cycles >= max => {
                warn!(max_wait_cycles = max, "Rate limiter wait budget exhausted");
                Err(CommonError::rate_limit_detailed(
                    config.requests_per_window,
                    config.window_size,
                    Some(wait),
                ))
            }
            _ => Ok(()),
        }
    }
}

//! Rate limiter that honors server-supplied retry hints
//!
//! APIs such as Figma's answer an over-quota request with HTTP 429 and a
//! `Retry-After` header. [`AdaptiveRateLimiter`] turns that hint into the next
//! wait: with a hint the caller waits exactly the hinted duration, without one
//! it falls back to the base limiter's own rejection estimate. The retry loop
//! itself stays with the caller.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::rate_limiter::{LimiterStatus, Permit, RateLimiter, RateLimiterStats};
use super::{Clock, TokioClock};
use crate::error::CommonResult;

/// Header consulted for retry hints unless configured otherwise
pub const DEFAULT_RETRY_HINT_HEADER: &str = "Retry-After";

/// Server-feedback wrapper around a shared [`RateLimiter`]
///
/// The wrapper holds no state of its own, so it can be created per call
/// around the limiter the registry hands out.
pub struct AdaptiveRateLimiter<C: Clock = TokioClock> {
    base: Arc<RateLimiter<C>>,
    retry_hint_header: String,
}

impl<C: Clock> fmt::Debug for AdaptiveRateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveRateLimiter")
            .field("base", &self.base)
            .field("retry_hint_header", &self.retry_hint_header)
            .finish()
    }
}

impl<C: Clock> Clone for AdaptiveRateLimiter<C> {
    fn clone(&self) -> Self {
        Self { base: Arc::clone(&self.base), retry_hint_header: self.retry_hint_header.clone() }
    }
}

impl<C: Clock> AdaptiveRateLimiter<C> {
    /// Wrap `base`, reading hints from `Retry-After`
    pub fn new(base: Arc<RateLimiter<C>>) -> Self {
        Self::with_header(base, DEFAULT_RETRY_HINT_HEADER)
    }

    /// Wrap `base`, reading hints from a custom header
    pub fn with_header(base: Arc<RateLimiter<C>>, retry_hint_header: impl Into<String>) -> Self {
        Self { base, retry_hint_header: retry_hint_header.into() }
    }

    /// Name of the header consulted for hints
    pub fn retry_hint_header(&self) -> &str {
        &self.retry_hint_header
    }

    /// Limiter this wrapper delegates to
    pub fn base(&self) -> &Arc<RateLimiter<C>> {
        &self.base
    }

    /// Extract the retry hint from response headers
    ///
    /// The header name matches case-insensitively. Values are read as
    /// delta-seconds (`"2"`, `"1.5"`) or as an HTTP date, in which case the
    /// hint is the time remaining until that date (zero if it has passed).
    pub fn retry_hint<'a, I>(&self, headers: I) -> Option<Duration>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let value = headers
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.retry_hint_header))
            .map(|(_, value)| value)?;

        let hint = parse_retry_hint(value, self.base.clock().system_time());
        if hint.is_none() {
            warn!(header = %self.retry_hint_header, value, "Ignoring unparseable retry hint");
        }
        hint
    }

    /// Wait to apply after a throttling response
    ///
    /// Exactly `hint` when the server supplied one, otherwise the base
    /// limiter's estimate floored at its `min_wait`. Either way the response
    /// counts as a rejection in the base limiter's stats.
    pub fn throttle_wait(&self, hint: Option<Duration>) -> Duration {
        let wait = match hint {
            Some(hint) => hint,
            None => self.base.wait_time().max(self.base.config().min_wait),
        };
        self.base.record_rejection(wait);
        debug!(
            wait_ms = wait.as_millis() as u64,
            hinted = hint.is_some(),
            "Throttled by server, backing off"
        );
        wait
    }

    /// Sleep for [`throttle_wait`](Self::throttle_wait) and return the wait
    pub async fn backoff(&self, hint: Option<Duration>) -> Duration {
        let wait = self.throttle_wait(hint);
        tokio::time::sleep(wait).await;
        wait
    }

    pub async fn acquire(&self) -> CommonResult<Permit> {
        self.base.acquire().await
    }

    pub fn can_admit_now(&self) -> bool {
        self.base.can_admit_now()
    }

    pub fn stats(&self) -> RateLimiterStats {
        self.base.stats()
    }

    pub fn status(&self) -> LimiterStatus {
        self.base.status()
    }

    pub fn reset(&self) {
        self.base.reset()
    }
}

fn parse_retry_hint(value: &str, now: SystemTime) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    if let Ok(secs) = value.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).ok();
    }

    let date = DateTime::parse_from_rfc2822(value).ok()?.with_timezone(&Utc);
    let now: DateTime<Utc> = now.into();
    Some((date - now).to_std().unwrap_or(Duration::ZERO))
}

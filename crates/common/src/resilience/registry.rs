//! Per-resource registry of shared rate limiters
//!
//! Every caller that talks to the same remote resource must draw from the same
//! budget. [`LimiterRegistry`] maps a resource key to exactly one
//! `Arc<RateLimiter>`, creating it lazily on first use. The registry is an
//! ordinary value owned by the caller; entries leave it only through
//! [`LimiterRegistry::remove`] or [`LimiterRegistry::remove_idle`].

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info};

use super::rate_limiter::{LimiterStatus, Permit, RateLimiter, RateLimiterConfig, RateLimiterStats};
use super::{Clock, TokioClock};
use crate::error::{CommonError, CommonResult};

/// Keyed collection of shared rate limiters
pub struct LimiterRegistry<C: Clock + Clone = TokioClock> {
    limiters: DashMap<String, Arc<RateLimiter<C>>>,
    default_config: Option<RateLimiterConfig>,
    clock: C,
}

impl LimiterRegistry<TokioClock> {
    /// Create a registry whose limiters follow tokio's clock
    ///
    /// Keys looked up without an explicit configuration use
    /// `default_config`; with no default such lookups fail.
    pub fn new(default_config: Option<RateLimiterConfig>) -> Self {
        Self::with_clock(default_config, TokioClock)
    }
}

impl<C: Clock + Clone> std::fmt::Debug for LimiterRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LimiterRegistry")
            .field("keys", &self.keys())
            .field("default_config", &self.default_config)
            .finish()
    }
}

impl<C: Clock + Clone> LimiterRegistry<C> {
    /// Create a registry whose limiters read `clock`
    pub fn with_clock(default_config: Option<RateLimiterConfig>, clock: C) -> Self {
        Self { limiters: DashMap::new(), default_config, clock }
    }

    /// Return the limiter for `key`, creating it on first use
    ///
    /// An existing limiter always wins over `config`. Concurrent first
    /// lookups of the same key observe the same instance.
    pub fn get_or_create(
        &self,
        key: &str,
        config: Option<RateLimiterConfig>,
    ) -> CommonResult<Arc<RateLimiter<C>>> {
        if let Some(existing) = self.limiters.get(key) {
            return Ok(Arc::clone(existing.value()));
        }

        let config = config
            .or_else(|| self.default_config.clone())
            .ok_or_else(|| CommonError::not_found_with_id("rate limiter configuration", key))?;
        config.validate()?;

        match self.limiters.entry(key.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let limiter = Arc::new(RateLimiter::with_clock(config, self.clock.clone())?);
                entry.insert(Arc::clone(&limiter));
                debug!(key, "Rate limiter created");
                Ok(limiter)
            }
        }
    }

    /// Explicitly create the limiter for `key`
    ///
    /// A key that is already registered keeps its current instance.
    pub fn register(&self, key: &str, config: RateLimiterConfig) -> CommonResult<Arc<RateLimiter<C>>> {
        if self.limiters.contains_key(key) {
            info!(key, "Rate limiter already registered, keeping existing instance");
        }
        self.get_or_create(key, Some(config))
    }

    /// Limiter for `key` if one exists; never creates
    pub fn get(&self, key: &str) -> Option<Arc<RateLimiter<C>>> {
        self.limiters.get(key).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.limiters.contains_key(key)
    }

    /// Registered keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.limiters.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }

    pub fn default_config(&self) -> Option<&RateLimiterConfig> {
        self.default_config.as_ref()
    }

    /// Suspend until the limiter for `key` admits a request
    pub async fn acquire(&self, key: &str) -> CommonResult<Permit> {
        let limiter = self.get_or_create(key, None)?;
        limiter.acquire().await
    }

    pub fn wait_time(&self, key: &str) -> CommonResult<Duration> {
        Ok(self.get_or_create(key, None)?.wait_time())
    }

    pub fn status(&self, key: &str) -> Option<LimiterStatus> {
        self.get(key).map(|limiter| limiter.status())
    }

    pub fn stats(&self, key: &str) -> Option<RateLimiterStats> {
        self.get(key).map(|limiter| limiter.stats())
    }

    /// Reset one limiter; returns false if `key` is unknown
    pub fn reset(&self, key: &str) -> bool {
        match self.get(key) {
            Some(limiter) => {
                limiter.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) {
        for entry in self.limiters.iter() {
            entry.value().reset();
        }
    }

    /// Drop the limiter for `key`
    ///
    /// Callers still holding the `Arc` keep using the old instance; the next
    /// lookup creates a fresh one.
    pub fn remove(&self, key: &str) -> Option<Arc<RateLimiter<C>>> {
        self.limiters.remove(key).map(|(_, limiter)| limiter)
    }

    /// Drop limiters idle for at least `max_idle` that nobody else holds
    ///
    /// Returns the number of limiters removed.
    pub fn remove_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now();
        let mut removed = 0;
        self.limiters.retain(|_, limiter| {
            let idle = now.saturating_duration_since(limiter.last_activity());
            let keep = idle < max_idle || Arc::strong_count(limiter) > 1;
            if !keep {
                removed += 1;
            }
            keep
        });
        if removed > 0 {
            debug!(removed, "Removed idle rate limiters");
        }
        removed
    }
}

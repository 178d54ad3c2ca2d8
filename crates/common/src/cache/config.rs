//! Cache configuration types and builder patterns
//!
//! This module provides configuration types for customizing cache behavior,
//! including eviction policies, TTL settings, and size limits.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Default maximum number of entries
pub const DEFAULT_MAX_SIZE: usize = 1000;
/// Default time-to-live for entries
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
/// Default interval between active expiry sweeps
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);
/// Longest lifetime an entry can have (about 100 years)
///
/// Per-entry overrides above this are clamped to it; configured TTLs and
/// sweep intervals above it are rejected.
pub const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Eviction policy for cache entries when capacity is reached
///
/// Parses from `"lru"`, `"fifo"` or `"lfu"` in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[allow(clippy::upper_case_acronyms)]
pub enum EvictionPolicy {
    /// Least Recently Used - evicts the least recently accessed entry
    #[default]
    LRU,
    /// Least Frequently Used - evicts the least frequently accessed entry,
    /// oldest insertion first on ties
    LFU,
    /// First In First Out - evicts the oldest entry by insertion time
    FIFO,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LRU => "lru",
            Self::LFU => "lfu",
            Self::FIFO => "fifo",
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EvictionPolicy {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lru" => Ok(Self::LRU),
            "lfu" => Ok(Self::LFU),
            "fifo" => Ok(Self::FIFO),
            other => Err(CommonError::config_field(
                "strategy",
                format!("unknown eviction strategy '{}', expected lru, fifo or lfu", other),
            )),
        }
    }
}

/// Configuration for cache behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of entries
    pub max_size: usize,

    /// Time-to-live applied when `set` gets no override
    pub ttl: Duration,

    /// Eviction policy when max_size is reached
    pub eviction_policy: EvictionPolicy,

    /// How often a spawned sweeper purges expired entries
    pub sweep_interval: Duration,

    /// Whether to collect hit/miss/eviction counters
    pub track_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            ttl: DEFAULT_TTL,
            eviction_policy: EvictionPolicy::LRU,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            track_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new configuration builder
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Quick preset for an LRU cache with the default TTL
    pub fn lru(max_size: usize) -> Self {
        Self { max_size, ..Self::default() }
    }

    /// Combined TTL + LRU cache
    pub fn ttl_lru(ttl: Duration, max_size: usize) -> Self {
        Self { max_size, ttl, ..Self::default() }
    }

    /// Reject configurations the cache cannot honor
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_size == 0 {
            return Err(CommonError::config_field("max_size", "must be greater than 0"));
        }
        if self.ttl.is_zero() {
            return Err(CommonError::config_field("ttl", "must be greater than zero"));
        }
        if self.ttl > MAX_TTL {
            return Err(CommonError::config_field(
                "ttl",
                format!("must not exceed {}s", MAX_TTL.as_secs()),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(CommonError::config_field("sweep_interval", "must be greater than zero"));
        }
        if self.sweep_interval > MAX_TTL {
            return Err(CommonError::config_field(
                "sweep_interval",
                format!("must not exceed {}s", MAX_TTL.as_secs()),
            ));
        }
        Ok(())
    }
}

/// Builder for CacheConfig with fluent API
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum number of entries
    pub fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = size;
        self
    }

    /// Set time-to-live for entries
    pub fn ttl(mut self, duration: Duration) -> Self {
        self.config.ttl = duration;
        self
    }

    /// Set eviction policy
    pub fn eviction_policy(mut self, policy: EvictionPolicy) -> Self {
        self.config.eviction_policy = policy;
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Enable or disable metrics tracking
    pub fn track_metrics(mut self, enabled: bool) -> Self {
        self.config.track_metrics = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> CacheConfig {
        self.config
    }
}

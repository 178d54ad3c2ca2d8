//! Governor configuration
//!
//! Loads [`GovernorConfig`] from a file, from environment variables, or both.
//!
//! ## Loading Strategy
//! 1. Start from defaults, or from the first config file found by
//!    [`probe_config_paths`]
//! 2. Layer any `FIGMAGEN_*` environment variables on top
//! 3. Validate; invalid values fail with `CommonError::Config` naming the
//!    offending field
//!
//! ## Environment Variables
//! - `FIGMAGEN_API_BASE_URL`: API origin (default `https://api.figma.com`)
//! - `FIGMAGEN_ACCESS_TOKEN`: personal access token
//! - `FIGMAGEN_REQUEST_TIMEOUT_SECS`: per-request timeout
//! - `FIGMAGEN_MAX_ATTEMPTS`: attempts per request while throttled
//! - `FIGMAGEN_CACHE_MAX_SIZE`: cache capacity in entries
//! - `FIGMAGEN_CACHE_TTL_SECS`: cache entry lifetime
//! - `FIGMAGEN_CACHE_STRATEGY`: `lru`, `fifo` or `lfu`
//! - `FIGMAGEN_CACHE_TRACK_METRICS`: whether to count hits/misses (true/false)
//! - `FIGMAGEN_RATE_REQUESTS_PER_WINDOW`: admissions per window
//! - `FIGMAGEN_RATE_BURST_LIMIT`: bucket capacity
//! - `FIGMAGEN_RATE_WINDOW_MS`: window length in milliseconds
//!
//! ## File Format
//! TOML (`.toml`) or JSON (`.json`), detected by extension:
//!
//! ```toml
//! max_attempts = 3
//!
//! [api]
//! base_url = "https://api.figma.com"
//! request_timeout_secs = 30
//!
//! [cache]
//! max_size = 1000
//! ttl_secs = 300
//! strategy = "lru"
//!
//! [rate_limit]
//! requests_per_window = 60
//! burst_limit = 10
//! window_ms = 60000
//!
//! # Per-resource overrides, layered over [rate_limit]
//! [resources.images]
//! requests_per_window = 20
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use figmagen_common::cache::{CacheConfig, EvictionPolicy};
use figmagen_common::error::{CommonError, CommonResult};
use figmagen_common::resilience::rate_limiter::{
    DEFAULT_BURST_LIMIT, DEFAULT_MIN_WAIT, DEFAULT_REQUESTS_PER_WINDOW, DEFAULT_WINDOW_SIZE,
};
use figmagen_common::resilience::{RateLimiterConfig, DEFAULT_RETRY_HINT_HEADER};
use serde::{Deserialize, Serialize};
use url::Url;

/// Default API origin
pub const DEFAULT_BASE_URL: &str = "https://api.figma.com";
/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
/// Default attempts per request while the API keeps answering 429
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

const ENV_API_BASE_URL: &str = "FIGMAGEN_API_BASE_URL";
const ENV_ACCESS_TOKEN: &str = "FIGMAGEN_ACCESS_TOKEN";
const ENV_REQUEST_TIMEOUT_SECS: &str = "FIGMAGEN_REQUEST_TIMEOUT_SECS";
const ENV_MAX_ATTEMPTS: &str = "FIGMAGEN_MAX_ATTEMPTS";
const ENV_CACHE_MAX_SIZE: &str = "FIGMAGEN_CACHE_MAX_SIZE";
const ENV_CACHE_TTL_SECS: &str = "FIGMAGEN_CACHE_TTL_SECS";
const ENV_CACHE_STRATEGY: &str = "FIGMAGEN_CACHE_STRATEGY";
const ENV_CACHE_TRACK_METRICS: &str = "FIGMAGEN_CACHE_TRACK_METRICS";
const ENV_RATE_REQUESTS_PER_WINDOW: &str = "FIGMAGEN_RATE_REQUESTS_PER_WINDOW";
const ENV_RATE_BURST_LIMIT: &str = "FIGMAGEN_RATE_BURST_LIMIT";
const ENV_RATE_WINDOW_MS: &str = "FIGMAGEN_RATE_WINDOW_MS";

/// Top-level governor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Attempts per request while the API answers 429 (at least 1)
    pub max_attempts: u32,
    pub api: ApiSettings,
    pub cache: CacheSettings,
    pub rate_limit: RateLimitSettings,
    /// Per-resource limiter overrides keyed by resource key (`files`,
    /// `images`, ...)
    pub resources: BTreeMap<String, ResourceLimitOverride>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            api: ApiSettings::default(),
            cache: CacheSettings::default(),
            rate_limit: RateLimitSettings::default(),
            resources: BTreeMap::new(),
        }
    }
}

/// Where and how to reach the API
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub request_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            access_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

// Keeps the token out of logs.
impl fmt::Debug for ApiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSettings")
            .field("base_url", &self.base_url)
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

/// Response cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub max_size: usize,
    pub ttl_secs: u64,
    /// Eviction strategy name, parsed case-insensitively
    pub strategy: String,
    pub sweep_interval_secs: u64,
    pub track_metrics: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            max_size: defaults.max_size,
            ttl_secs: defaults.ttl.as_secs(),
            strategy: defaults.eviction_policy.as_str().to_string(),
            sweep_interval_secs: defaults.sweep_interval.as_secs(),
            track_metrics: defaults.track_metrics,
        }
    }
}

/// Default limiter settings applied to every resource key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub requests_per_window: u32,
    pub burst_limit: u32,
    pub window_ms: u64,
    pub min_wait_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_wait_cycles: Option<u32>,
    /// Response header carrying the server's retry hint
    pub retry_hint_header: String,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            requests_per_window: DEFAULT_REQUESTS_PER_WINDOW,
            burst_limit: DEFAULT_BURST_LIMIT,
            window_ms: DEFAULT_WINDOW_SIZE.as_millis() as u64,
            min_wait_ms: DEFAULT_MIN_WAIT.as_millis() as u64,
            max_wait_cycles: None,
            retry_hint_header: DEFAULT_RETRY_HINT_HEADER.to_string(),
        }
    }
}

/// Partial limiter settings for one resource; unset fields inherit from
/// `[rate_limit]`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceLimitOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_window: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub burst_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_ms: Option<u64>,
}

impl GovernorConfig {
    /// Parse and validate TOML text
    ///
    /// # Errors
    /// Returns `CommonError::Config` if the text is not valid TOML or any
    /// value is out of range.
    pub fn from_toml_str(contents: &str) -> CommonResult<Self> {
        let config: Self = toml::from_str(contents)
            .map_err(|e| CommonError::config(format!("Invalid TOML format: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Layer `FIGMAGEN_*` variables from `lookup` over this configuration
    ///
    /// `lookup` is usually `|key| std::env::var(key).ok()`; tests pass a map.
    ///
    /// # Errors
    /// Returns `CommonError::Config` naming the variable when a value does
    /// not parse.
    pub fn apply_env<F>(mut self, lookup: F) -> CommonResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(token) = lookup(ENV_ACCESS_TOKEN) {
            self.api.access_token = Some(token);
        }
        if let Some(raw) = lookup(ENV_REQUEST_TIMEOUT_SECS) {
            self.api.request_timeout_secs = parse_env(ENV_REQUEST_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_ATTEMPTS) {
            self.max_attempts = parse_env(ENV_MAX_ATTEMPTS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CACHE_MAX_SIZE) {
            self.cache.max_size = parse_env(ENV_CACHE_MAX_SIZE, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CACHE_TTL_SECS) {
            self.cache.ttl_secs = parse_env(ENV_CACHE_TTL_SECS, &raw)?;
        }
        if let Some(strategy) = lookup(ENV_CACHE_STRATEGY) {
            self.cache.strategy = strategy;
        }
        if let Some(raw) = lookup(ENV_CACHE_TRACK_METRICS) {
            self.cache.track_metrics = parse_bool(ENV_CACHE_TRACK_METRICS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RATE_REQUESTS_PER_WINDOW) {
            self.rate_limit.requests_per_window = parse_env(ENV_RATE_REQUESTS_PER_WINDOW, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RATE_BURST_LIMIT) {
            self.rate_limit.burst_limit = parse_env(ENV_RATE_BURST_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RATE_WINDOW_MS) {
            self.rate_limit.window_ms = parse_env(ENV_RATE_WINDOW_MS, &raw)?;
        }
        Ok(self)
    }

    /// Reject configurations the governor cannot honor
    pub fn validate(&self) -> CommonResult<()> {
        if self.max_attempts == 0 {
            return Err(CommonError::config_field("max_attempts", "must be at least 1"));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(CommonError::config_field(
                "api.request_timeout_secs",
                "must be greater than zero",
            ));
        }
        let base_url = Url::parse(&self.api.base_url).map_err(|e| {
            CommonError::config_field("api.base_url", format!("invalid URL: {}", e))
        })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(CommonError::config_field(
                "api.base_url",
                format!("unsupported scheme '{}'", base_url.scheme()),
            ));
        }

        self.cache_config()?;
        self.rate_limiter_config()?;
        self.resource_limiter_configs()?;
        Ok(())
    }

    /// Cache configuration derived from `[cache]`
    pub fn cache_config(&self) -> CommonResult<CacheConfig> {
        let policy = EvictionPolicy::from_str(&self.cache.strategy)
            .map_err(|e| scoped("cache", e))?;
        let config = CacheConfig::builder()
            .max_size(self.cache.max_size)
            .ttl(Duration::from_secs(self.cache.ttl_secs))
            .eviction_policy(policy)
            .sweep_interval(Duration::from_secs(self.cache.sweep_interval_secs))
            .track_metrics(self.cache.track_metrics)
            .build();
        config.validate().map_err(|e| scoped("cache", e))?;
        Ok(config)
    }

    /// Default limiter configuration derived from `[rate_limit]`
    pub fn rate_limiter_config(&self) -> CommonResult<RateLimiterConfig> {
        self.build_limiter_config(&ResourceLimitOverride::default())
            .map_err(|e| scoped("rate_limit", e))
    }

    /// One limiter configuration per `[resources.*]` entry, in key order
    pub fn resource_limiter_configs(&self) -> CommonResult<Vec<(String, RateLimiterConfig)>> {
        self.resources
            .iter()
            .map(|(key, overrides)| {
                self.build_limiter_config(overrides)
                    .map(|config| (key.clone(), config))
                    .map_err(|e| scoped(&format!("resources.{}", key), e))
            })
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    fn build_limiter_config(
        &self,
        overrides: &ResourceLimitOverride,
    ) -> CommonResult<RateLimiterConfig> {
        let base = &self.rate_limit;
        let config = RateLimiterConfig {
            requests_per_window: overrides.requests_per_window.unwrap_or(base.requests_per_window),
            burst_limit: overrides.burst_limit.unwrap_or(base.burst_limit),
            window_size: Duration::from_millis(overrides.window_ms.unwrap_or(base.window_ms)),
            min_wait: Duration::from_millis(base.min_wait_ms),
            max_wait_cycles: base.max_wait_cycles,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Load configuration: config file if one is found, then environment
///
/// # Errors
/// Returns `CommonError::Config` if a found file cannot be parsed, an
/// environment variable is malformed or the result fails validation.
pub fn load() -> CommonResult<GovernorConfig> {
    let base = match probe_config_paths() {
        Some(path) => load_from_file(Some(path))?,
        None => {
            tracing::debug!("No config file found, starting from defaults");
            GovernorConfig::default()
        }
    };

    let config = base.apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    tracing::info!(
        base_url = %config.api.base_url,
        cache_max_size = config.cache.max_size,
        cache_strategy = %config.cache.strategy,
        requests_per_window = config.rate_limit.requests_per_window,
        burst_limit = config.rate_limit.burst_limit,
        "Governor configuration loaded"
    );
    Ok(config)
}

/// Load configuration from defaults plus environment variables only
///
/// # Errors
/// Returns `CommonError::Config` if a variable is malformed or the result
/// fails validation.
pub fn load_from_env() -> CommonResult<GovernorConfig> {
    let config = GovernorConfig::default().apply_env(|key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `CommonError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid or a value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> CommonResult<GovernorConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CommonError::config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CommonError::config("No config file found in any of the standard locations")
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CommonError::config(format!("Failed to read config file: {}", e)))?;

    let config = parse_config(&contents, &config_path)?;
    config.validate()?;
    Ok(config)
}

/// Format is detected by file extension (`.toml` or `.json`).
fn parse_config(contents: &str, path: &Path) -> CommonResult<GovernorConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CommonError::config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| CommonError::config(format!("Invalid JSON format: {}", e))),
        _ => Err(CommonError::config(format!("Unsupported config format: {}", extension))),
    }
}

/// Probe the standard locations for a config file
///
/// Searches the current working directory, then its `config/` directory,
/// then the executable's directory, for `figmagen.toml` or `figmagen.json`.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend([
            cwd.join("figmagen.toml"),
            cwd.join("figmagen.json"),
            cwd.join("config/figmagen.toml"),
            cwd.join("config/figmagen.json"),
        ]);
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend([exe_dir.join("figmagen.toml"), exe_dir.join("figmagen.json")]);
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

fn parse_env<T>(key: &str, raw: &str) -> CommonResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| CommonError::config_field(key, format!("invalid value '{}': {}", raw, e)))
}

/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn parse_bool(key: &str, raw: &str) -> CommonResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CommonError::config_field(key, format!("invalid boolean '{}'", raw))),
    }
}

/// Prefix a field error with its config section.
fn scoped(section: &str, err: CommonError) -> CommonError {
    match err {
        CommonError::Config { message, field: Some(field) } => {
            CommonError::config_field(format!("{}.{}", section, field), message)
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for config.
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    fn field_of(err: &CommonError) -> Option<&str> {
        match err {
            CommonError::Config { field, .. } => field.as_deref(),
            _ => None,
        }
    }

    /// Validates `GovernorConfig::default` behavior for the documented
    /// defaults scenario.
    ///
    /// Assertions:
    /// - Confirms every default matches the documented value.
    /// - Confirms the defaults validate.
    #[test]
    fn test_defaults() {
        let config = GovernorConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.api.base_url, "https://api.figma.com");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.cache.max_size, 1000);
        assert_eq!(config.cache.ttl_secs, 300);
        assert_eq!(config.cache.strategy, "lru");
        assert_eq!(config.rate_limit.requests_per_window, 60);
        assert_eq!(config.rate_limit.burst_limit, 10);
        assert_eq!(config.rate_limit.window_ms, 60_000);
        assert_eq!(config.rate_limit.retry_hint_header, "Retry-After");
        assert!(config.validate().is_ok());
    }

    /// Validates `GovernorConfig::from_toml_str` behavior for the partial
    /// file scenario.
    ///
    /// Assertions:
    /// - Ensures unspecified fields keep their defaults.
    /// - Ensures per-resource overrides inherit unset fields.
    #[test]
    fn test_from_toml_partial() {
        let config = GovernorConfig::from_toml_str(
            r#"
            max_attempts = 5

            [cache]
            strategy = "FIFO"
            ttl_secs = 60

            [rate_limit]
            burst_limit = 4

            [resources.images]
            requests_per_window = 20
            "#,
        )
        .expect("valid toml");

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.cache.max_size, 1000);

        let cache = config.cache_config().expect("cache config");
        assert_eq!(cache.eviction_policy, EvictionPolicy::FIFO);
        assert_eq!(cache.ttl, Duration::from_secs(60));

        let resources = config.resource_limiter_configs().expect("resource configs");
        assert_eq!(resources.len(), 1);
        let (key, images) = &resources[0];
        assert_eq!(key, "images");
        assert_eq!(images.requests_per_window, 20);
        assert_eq!(images.burst_limit, 4);
        assert_eq!(images.window_size, Duration::from_secs(60));
    }

    /// Validates `GovernorConfig::from_toml_str` behavior for the invalid
    /// strategy scenario.
    ///
    /// Assertions:
    /// - Confirms an unknown strategy fails with a config error naming
    ///   `cache.strategy`.
    #[test]
    fn test_invalid_strategy_rejected() {
        let err = GovernorConfig::from_toml_str("[cache]\nstrategy = \"random\"\n")
            .expect_err("unknown strategy");
        assert_eq!(field_of(&err), Some("cache.strategy"));
    }

    /// Validates `GovernorConfig::validate` behavior for the zero limits
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures zero values are rejected with their qualified field name.
    #[test]
    fn test_zero_values_rejected() {
        let mut config = GovernorConfig::default();
        config.cache.max_size = 0;
        assert_eq!(field_of(&config.validate().expect_err("zero size")), Some("cache.max_size"));

        let mut config = GovernorConfig::default();
        config.rate_limit.burst_limit = 0;
        assert_eq!(
            field_of(&config.validate().expect_err("zero burst")),
            Some("rate_limit.burst_limit")
        );

        let mut config = GovernorConfig::default();
        config.resources.insert(
            "images".to_string(),
            ResourceLimitOverride { window_ms: Some(0), ..Default::default() },
        );
        assert_eq!(
            field_of(&config.validate().expect_err("zero window")),
            Some("resources.images.window_size")
        );

        let config = GovernorConfig { max_attempts: 0, ..Default::default() };
        assert_eq!(field_of(&config.validate().expect_err("zero attempts")), Some("max_attempts"));
    }

    /// Validates `GovernorConfig::validate` behavior for the base URL
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms malformed URLs and non-HTTP schemes are rejected.
    #[test]
    fn test_base_url_validation() {
        let mut config = GovernorConfig::default();
        config.api.base_url = "not a url".to_string();
        assert_eq!(field_of(&config.validate().expect_err("bad url")), Some("api.base_url"));

        config.api.base_url = "ftp://api.figma.com".to_string();
        assert_eq!(field_of(&config.validate().expect_err("bad scheme")), Some("api.base_url"));

        config.api.base_url = "http://127.0.0.1:8080".to_string();
        assert!(config.validate().is_ok());
    }

    /// Validates `GovernorConfig::apply_env` behavior for the environment
    /// overlay scenario.
    ///
    /// Assertions:
    /// - Confirms every variable lands in its field.
    /// - Confirms unset variables leave existing values alone.
    #[test]
    fn test_apply_env_overlay() {
        let config = GovernorConfig::default()
            .apply_env(lookup(&[
                ("FIGMAGEN_CACHE_MAX_SIZE", "50"),
                ("FIGMAGEN_CACHE_TTL_SECS", "10"),
                ("FIGMAGEN_CACHE_STRATEGY", "lfu"),
                ("FIGMAGEN_CACHE_TRACK_METRICS", "off"),
                ("FIGMAGEN_RATE_REQUESTS_PER_WINDOW", "30"),
                ("FIGMAGEN_RATE_BURST_LIMIT", "5"),
                ("FIGMAGEN_RATE_WINDOW_MS", "1000"),
                ("FIGMAGEN_MAX_ATTEMPTS", "2"),
                ("FIGMAGEN_API_BASE_URL", "http://localhost:9000"),
                ("FIGMAGEN_ACCESS_TOKEN", "figd_secret"),
            ]))
            .expect("valid overlay");

        assert_eq!(config.cache.max_size, 50);
        assert_eq!(config.cache.ttl_secs, 10);
        assert_eq!(config.cache.strategy, "lfu");
        assert!(!config.cache.track_metrics);
        assert_eq!(config.rate_limit.requests_per_window, 30);
        assert_eq!(config.rate_limit.burst_limit, 5);
        assert_eq!(config.rate_limit.window_ms, 1000);
        assert_eq!(config.max_attempts, 2);
        assert_eq!(config.api.base_url, "http://localhost:9000");
        assert_eq!(config.api.access_token.as_deref(), Some("figd_secret"));
        assert_eq!(config.api.request_timeout_secs, 30);
        assert!(config.validate().is_ok());
    }

    /// Validates `GovernorConfig::apply_env` behavior for the malformed
    /// variable scenario.
    ///
    /// Assertions:
    /// - Confirms the error names the offending variable.
    #[test]
    fn test_apply_env_malformed() {
        let err = GovernorConfig::default()
            .apply_env(lookup(&[("FIGMAGEN_RATE_BURST_LIMIT", "ten")]))
            .expect_err("not a number");
        assert_eq!(field_of(&err), Some("FIGMAGEN_RATE_BURST_LIMIT"));

        let err = GovernorConfig::default()
            .apply_env(lookup(&[("FIGMAGEN_CACHE_TRACK_METRICS", "maybe")]))
            .expect_err("not a bool");
        assert_eq!(field_of(&err), Some("FIGMAGEN_CACHE_TRACK_METRICS"));
    }

    /// Validates `GovernorConfig::validate` behavior for the oversized TTL
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `FIGMAGEN_CACHE_TTL_SECS` at `u64::MAX` parses but fails
    ///   validation naming `cache.ttl`.
    /// - Ensures the governor refuses to start with it.
    #[tokio::test]
    async fn test_oversized_ttl_rejected() {
        let config = GovernorConfig::default()
            .apply_env(lookup(&[("FIGMAGEN_CACHE_TTL_SECS", "18446744073709551615")]))
            .expect("parses as u64");
        assert_eq!(config.cache.ttl_secs, u64::MAX);
        assert_eq!(field_of(&config.validate().expect_err("ttl too large")), Some("cache.ttl"));

        let transport = crate::http::HttpTransport::from_config(&GovernorConfig::default())
            .expect("transport");
        let err = crate::governor::RequestGovernor::new(config, std::sync::Arc::new(transport))
            .expect_err("rejected before any set");
        assert!(matches!(err, crate::governor::GovernorError::Common(CommonError::Config { .. })));
    }

    /// Validates `ApiSettings` Debug behavior for the token redaction
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures the access token never appears in debug output.
    #[test]
    fn test_debug_redacts_token() {
        let mut config = GovernorConfig::default();
        config.api.access_token = Some("figd_secret".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("figd_secret"));
        assert!(rendered.contains("<redacted>"));
    }

    /// Validates `parse_config` behavior for the JSON file scenario.
    ///
    /// Assertions:
    /// - Confirms JSON is accepted and unknown extensions are rejected.
    #[test]
    fn test_parse_config_formats() {
        let json = r#"{ "cache": { "max_size": 10 }, "max_attempts": 1 }"#;
        let config = parse_config(json, Path::new("figmagen.json")).expect("json config");
        assert_eq!(config.cache.max_size, 10);
        assert_eq!(config.max_attempts, 1);

        assert!(parse_config(json, Path::new("figmagen.yaml")).is_err());
    }
}

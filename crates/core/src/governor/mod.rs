//! Request governor
//!
//! Every outgoing API request passes through three gates:
//!
//! 1. **Cache**: a fresh cached body is returned without touching the
//!    network
//! 2. **Rate limiter**: the request waits for a permit from the limiter
//!    registered for its resource key
//! 3. **Server feedback**: a 429 response is retried after the wait the
//!    server asked for (`Retry-After`), at most `max_attempts` times in total
//!
//! Successful bodies are cached under the request's cache key. Any other
//! non-2xx status fails immediately with [`GovernorError::Status`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use figmagen_core::governor::{ApiRequest, RequestGovernor};
//! use figmagen_core::GovernorConfig;
//!
//! # async fn example() -> Result<(), figmagen_core::GovernorError> {
//! let governor = RequestGovernor::with_http_transport(GovernorConfig::default())?;
//! let document = governor.fetch(&ApiRequest::file("AbC123xyz")).await?;
//! println!("{}", document["name"]);
//! governor.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod request;
mod transport;

use std::sync::Arc;

use figmagen_common::cache::{Cache, CacheSweeper};
use figmagen_common::resilience::{AdaptiveRateLimiter, LimiterRegistry};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

pub use error::{GovernorError, GovernorResult, TransportError};
pub use request::{parse_file_key, ApiRequest, ApiResponse, RESOURCE_FILES, RESOURCE_IMAGES};
pub use transport::Transport;

use crate::config::GovernorConfig;
use crate::http::HttpTransport;

/// Cache holding decoded response bodies
pub type ResponseCache = Cache<String, Arc<Value>>;

/// Cache-first, rate-limited, throttle-aware API client
pub struct RequestGovernor {
    transport: Arc<dyn Transport>,
    cache: ResponseCache,
    registry: LimiterRegistry,
    max_attempts: u32,
    retry_hint_header: String,
    sweeper: Mutex<Option<CacheSweeper>>,
}

impl std::fmt::Debug for RequestGovernor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestGovernor")
            .field("cache", &self.cache)
            .field("registry", &self.registry)
            .field("max_attempts", &self.max_attempts)
            .field("retry_hint_header", &self.retry_hint_header)
            .finish()
    }
}

impl RequestGovernor {
    /// Build the cache and limiter registry from `config` and start the
    /// cache sweeper
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `GovernorError::Common` with a config error if any section of
    /// `config` is invalid.
    pub fn new(config: GovernorConfig, transport: Arc<dyn Transport>) -> GovernorResult<Self> {
        config.validate()?;

        let cache_config = config.cache_config()?;
        let sweep_interval = cache_config.sweep_interval;
        let cache = ResponseCache::new(cache_config)?;

        let registry = LimiterRegistry::new(Some(config.rate_limiter_config()?));
        for (key, limiter_config) in config.resource_limiter_configs()? {
            registry.register(&key, limiter_config)?;
        }

        let sweeper = cache.spawn_sweeper(sweep_interval);

        info!(
            max_attempts = config.max_attempts,
            cache_max_size = cache.config().max_size,
            cache_policy = %cache.config().eviction_policy,
            resources = ?registry.keys(),
            "request governor ready"
        );

        Ok(Self {
            transport,
            cache,
            registry,
            max_attempts: config.max_attempts,
            retry_hint_header: config.rate_limit.retry_hint_header,
            sweeper: Mutex::new(Some(sweeper)),
        })
    }

    /// Build a governor that talks HTTP to `config.api.base_url`
    pub fn with_http_transport(config: GovernorConfig) -> GovernorResult<Self> {
        let transport =
            HttpTransport::from_config(&config).map_err(|e| GovernorError::transport("http", e))?;
        Self::new(config, Arc::new(transport))
    }

    /// Fetch a response body, from cache when possible
    ///
    /// # Errors
    ///
    /// - `GovernorError::Throttled` if every attempt was answered with 429
    /// - `GovernorError::Status` for any other non-2xx response
    /// - `GovernorError::Transport` if the request never got a response
    /// - `GovernorError::Common` if the limiter gave up waiting
    #[instrument(skip(self, request), fields(resource = %request.resource_key, cache_key = %request.cache_key))]
    pub async fn fetch(&self, request: &ApiRequest) -> GovernorResult<Arc<Value>> {
        if let Some(body) = self.cache.get(request.cache_key.as_str()) {
            debug!("cache hit");
            return Ok(body);
        }

        let limiter = self.registry.get_or_create(&request.resource_key, None)?;
        let adaptive =
            AdaptiveRateLimiter::with_header(Arc::clone(&limiter), self.retry_hint_header.clone());
        let mut retry_after = None;

        for attempt in 1..=self.max_attempts {
            let permit = limiter.acquire().await?;
            let response = self
                .transport
                .execute(request)
                .await
                .map_err(|e| GovernorError::transport(&request.resource_key, e))?;

            if response.is_success() {
                debug!(
                    attempt,
                    status = response.status,
                    waited_ms = permit.waited.as_millis() as u64,
                    "fetched"
                );
                let body = Arc::new(response.body);
                self.cache.set(request.cache_key.clone(), Arc::clone(&body), None);
                return Ok(body);
            }

            if !response.is_throttled() {
                warn!(attempt, status = response.status, "request failed");
                return Err(GovernorError::Status {
                    resource: request.resource_key.clone(),
                    status: response.status,
                });
            }

            retry_after = adaptive.retry_hint(response.header_pairs());
            if attempt < self.max_attempts {
                let waited = adaptive.backoff(retry_after).await;
                warn!(
                    attempt,
                    max_attempts = self.max_attempts,
                    waited_ms = waited.as_millis() as u64,
                    "throttled by server, backed off"
                );
            }
        }

        warn!(attempts = self.max_attempts, "still throttled, giving up");
        Err(GovernorError::Throttled {
            resource: request.resource_key.clone(),
            attempts: self.max_attempts,
            retry_after,
        })
    }

    /// Drop a cached body so the next fetch goes to the network
    pub fn invalidate(&self, cache_key: &str) -> bool {
        self.cache.delete(cache_key)
    }

    /// Response cache, for stats and manual invalidation
    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Per-resource limiters
    pub fn registry(&self) -> &LimiterRegistry {
        &self.registry
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Stop the cache sweeper and wait for it to exit
    ///
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
            info!("request governor shut down");
        }
    }
}

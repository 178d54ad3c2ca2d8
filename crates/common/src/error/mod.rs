//! Common error types shared by the cache, the rate limiters and the governor
//!
//! # Error Taxonomy
//!
//! The governor distinguishes a small number of failure kinds. Most
//! throttling and cache conditions are *not* errors at all:
//!
//! | Condition | Representation |
//! |-----------|----------------|
//! | Invalid `max_size` / `ttl` / `strategy` / limiter limits | `CommonError::Config` (fail fast) |
//! | Capacity backpressure | a computed wait, never an error |
//! | Expired or absent cache key | `None`, never an error |
//! | Registry key with no default and no registration | `CommonError::NotFound` |
//! | Explicit wait-cycle cap exhausted | `CommonError::RateLimitExceeded` |
//! | Pending wait abandoned through a cancellation token | `CommonError::TaskCancelled` |
//!
//! ## ErrorClassification Trait
//!
//! Every error type in the workspace implements `ErrorClassification` so
//! callers can make retry and alerting decisions without matching on
//! concrete variants:
//!
//! - **`is_retryable()`**: Can this operation be retried?
//! - **`severity()`**: How serious is this error? (Info/Warning/Error/Critical)
//! - **`is_critical()`**: Does this require immediate attention?
//!
//! Transport failures belong to the governor (`GovernorError::Transport`),
//! not to this enum.
//! - **`retry_after()`**: Suggested retry delay (if applicable)
//!
//! ## Composition
//!
//! Crate-specific errors embed `CommonError` instead of duplicating its
//! variants:
//!
//! ```rust,ignore
//! #[derive(Debug, Error)]
//! pub enum GovernorError {
//!     #[error("Transport failed: {0}")]
//!     Transport(#[from] TransportError),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//! ```

use std::fmt;
use std::time::Duration;

/// Standard result type using CommonError
pub type CommonResult<T> = Result<T, CommonError>;

/// Common error variants that appear across multiple modules
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    /// Configuration-related errors
    Config { message: String, field: Option<String> },

    /// Rate limiting errors
    RateLimitExceeded {
        limit: Option<u32>,
        window: Option<Duration>,
        retry_after: Option<Duration>,
    },

    /// Resource not found errors
    NotFound { resource_type: String, identifier: Option<String> },

    /// Task cancellation (async)
    TaskCancelled { task_id: String, reason: Option<String> },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message, field } => {
                if let Some(field) = field {
                    write!(f, "Configuration error in field '{}': {}", field, message)
                } else {
                    write!(f, "Configuration error: {}", message)
                }
            }
            Self::RateLimitExceeded { limit, window, retry_after } => {
                let mut msg = "Rate limit exceeded".to_string();
                if let (Some(limit), Some(window)) = (limit, window) {
                    msg.push_str(&format!(": {} requests per {:?}", limit, window));
                }
                if let Some(retry) = retry_after {
                    msg.push_str(&format!(" (retry in {:?})", retry));
                }
                write!(f, "{}", msg)
            }
            Self::NotFound { resource_type, identifier } => {
                if let Some(id) = identifier {
                    write!(f, "{} not found: '{}'", resource_type, id)
                } else {
                    write!(f, "{} not found", resource_type)
                }
            }
            Self::TaskCancelled { task_id, reason } => {
                if let Some(reason) = reason {
                    write!(f, "Task '{}' cancelled: {}", task_id, reason)
                } else {
                    write!(f, "Task '{}' cancelled", task_id)
                }
            }
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimitExceeded { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Config { .. } => ErrorSeverity::Error,
            Self::RateLimitExceeded { .. } => ErrorSeverity::Warning,
            Self::NotFound { .. } => ErrorSeverity::Info,
            Self::TaskCancelled { .. } => ErrorSeverity::Info,
        }
    }

    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimitExceeded { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl CommonError {
    /// Create a simple configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into(), field: None }
    }

    /// Create a configuration error for a specific field
    pub fn config_field<S: Into<String>, F: Into<String>>(field: F, message: S) -> Self {
        Self::Config { message: message.into(), field: Some(field.into()) }
    }

    /// Create a rate limit error with details
    pub fn rate_limit_detailed(
        limit: u32,
        window: Duration,
        retry_after: Option<Duration>,
    ) -> Self {
        Self::RateLimitExceeded { limit: Some(limit), window: Some(window), retry_after }
    }

    /// Create a not found error with identifier
    pub fn not_found_with_id<T: Into<String>, I: Into<String>>(
        resource_type: T,
        identifier: I,
    ) -> Self {
        Self::NotFound { resource_type: resource_type.into(), identifier: Some(identifier.into()) }
    }

    /// Create a task cancellation error with reason
    pub fn task_cancelled_with_reason<S: Into<String>, R: Into<String>>(
        task_id: S,
        reason: R,
    ) -> Self {
        Self::TaskCancelled { task_id: task_id.into(), reason: Some(reason.into()) }
    }

    /// Stable label for metrics and log fields
    pub fn error_type_name(&self) -> &'static str {
        match self {
            Self::Config { .. } => "config",
            Self::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Self::NotFound { .. } => "not_found",
            Self::TaskCancelled { .. } => "task_cancelled",
        }
    }
}

/// Error classification trait for consistent error handling across modules
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if attempted
    /// again, such as throttling or a temporarily unavailable backend.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool;

    /// Get the suggested retry delay if applicable
    ///
    /// Returns `Some(Duration)` when a specific delay is known, for example
    /// from a `Retry-After` header.
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

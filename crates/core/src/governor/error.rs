//! Governor error types

use std::time::Duration;

use figmagen_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Failures below HTTP: the request never produced a response
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Connection(err.to_string())
        }
    }
}

/// Governor error type
#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("Transport failed for '{resource}': {source}")]
    Transport {
        resource: String,
        #[source]
        source: TransportError,
    },

    #[error("Request for '{resource}' failed with HTTP {status}")]
    Status { resource: String, status: u16 },

    #[error("'{resource}' still throttled after {attempts} attempts")]
    Throttled { resource: String, attempts: u32, retry_after: Option<Duration> },

    #[error(transparent)]
    Common(#[from] CommonError),
}

/// Governor result type
pub type GovernorResult<T> = Result<T, GovernorError>;

impl GovernorError {
    pub(crate) fn transport(resource: &str, source: TransportError) -> Self {
        Self::Transport { resource: resource.to_string(), source }
    }

    /// Stable label for structured logging
    pub fn label(&self) -> &'static str {
        match self {
            Self::Transport { .. } => "transport",
            Self::Status { .. } => "status",
            Self::Throttled { .. } => "throttled",
            Self::Common(err) => err.error_type_name(),
        }
    }
}

impl ErrorClassification for GovernorError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { source, .. } => {
                matches!(source, TransportError::Timeout(_) | TransportError::Connection(_))
            }
            Self::Status { status, .. } => *status >= 500,
            Self::Throttled { .. } => true,
            Self::Common(err) => err.is_retryable(),
        }
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Transport { .. } => ErrorSeverity::Error,
            Self::Status { status, .. } if *status >= 500 => ErrorSeverity::Error,
            Self::Status { .. } => ErrorSeverity::Warning,
            Self::Throttled { .. } => ErrorSeverity::Warning,
            Self::Common(err) => err.severity(),
        }
    }

    fn is_critical(&self) -> bool {
        match self {
            Self::Common(err) => err.is_critical(),
            _ => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after, .. } => *retry_after,
            Self::Common(err) => err.retry_after(),
            _ => None,
        }
    }
}

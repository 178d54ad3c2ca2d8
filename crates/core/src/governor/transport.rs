//! Port interface for sending API requests
//!
//! The governor decides *whether* and *when* a request goes out; a
//! `Transport` decides *how*.

use async_trait::async_trait;

use super::error::TransportError;
use super::request::{ApiRequest, ApiResponse};

/// Trait for executing a single API request
///
/// Implementations return every HTTP response as `Ok`, including 4xx and
/// 5xx; status handling belongs to the governor. `Err` is reserved for
/// requests that never produced a response.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request once, without retries
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError>;
}

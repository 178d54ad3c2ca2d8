//! reqwest-backed [`Transport`]
//!
//! Sends each request exactly once; retries and throttling are the
//! governor's job. Authenticates with the `X-Figma-Token` header.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::config::GovernorConfig;
use crate::governor::{ApiRequest, ApiResponse, Transport, TransportError};

/// Header carrying the personal access token
pub const TOKEN_HEADER: &str = "X-Figma-Token";

/// HTTP transport for the design API
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    base_url: String,
    access_token: Option<String>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .field("authenticated", &self.access_token.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpTransport {
    /// Create a transport for `base_url`
    ///
    /// # Errors
    ///
    /// Returns `TransportError::InvalidRequest` if the underlying client
    /// cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::InvalidRequest(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
            timeout,
        })
    }

    /// Create a transport from the `[api]` section
    pub fn from_config(config: &GovernorConfig) -> Result<Self, TransportError> {
        Self::new(
            config.api.base_url.clone(),
            config.api.access_token.clone(),
            config.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn map_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout(self.timeout)
        } else {
            TransportError::from(err)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(resource = %request.resource_key, path = %request.path))]
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!(url = %url, "GET request");

        let mut builder = self.client.get(&url).query(&request.query);
        if let Some(token) = &self.access_token {
            builder = builder.header(TOKEN_HEADER, token);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        debug!(status, body_bytes = bytes.len(), "received response");

        Ok(ApiResponse { status, headers, body })
    }
}

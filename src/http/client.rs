//! HTTP client with rate limiting and response classification
//!
//! Provides the single-request primitive the page walker is built on:
//! - Rate limiting before every send
//! - API key attached to every request
//! - Response classification into a [`FetchOutcome`]
//!
//! Retries are deliberately absent here; see `pagination::RetryPolicy`.

use super::auth::ApiKey;
use super::rate_limit::{RateLimiter, RateLimiterConfig};
use super::types::{FailureKind, FetchFailure, FetchOutcome};
use crate::error::{Error, Result};
use crate::types::StringMap;
use reqwest::{Client, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

/// Longest response body kept in a failure detail
const MAX_DETAIL_LEN: usize = 512;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for relative request paths
    pub base_url: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Rate limiter configuration
    pub rate_limit: Option<RateLimiterConfig>,
    /// Default headers for all requests
    pub default_headers: HashMap<String, String>,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            rate_limit: Some(RateLimiterConfig::default()),
            default_headers: HashMap::new(),
            user_agent: format!("govinfo-scraper/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpClientConfig {
    /// Create a new config builder
    pub fn builder() -> HttpClientConfigBuilder {
        HttpClientConfigBuilder::default()
    }
}

/// Builder for HTTP client config
#[derive(Default)]
pub struct HttpClientConfigBuilder {
    config: HttpClientConfig,
}

impl HttpClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set rate limiter
    pub fn rate_limit(mut self, config: RateLimiterConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Disable rate limiting
    pub fn no_rate_limit(mut self) -> Self {
        self.config.rate_limit = None;
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> HttpClientConfig {
        self.config
    }
}

/// Configuration for a single request
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    /// Query parameters
    pub query: StringMap,
    /// Request headers
    pub headers: StringMap,
    /// Override timeout for this request
    pub timeout: Option<Duration>,
}

impl RequestConfig {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Rate-limited, authenticated GET client
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
    api_key: ApiKey,
    rate_limiter: Option<RateLimiter>,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(config: HttpClientConfig, api_key: ApiKey) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        let rate_limiter = config.rate_limit.as_ref().map(RateLimiter::new);

        Ok(Self {
            client,
            config,
            api_key,
            rate_limiter,
        })
    }

    /// Check if rate limiting is enabled
    pub fn has_rate_limiter(&self) -> bool {
        self.rate_limiter.is_some()
    }

    /// Issue one GET and classify the response
    ///
    /// `Err` is only returned for caller mistakes caught before anything is
    /// sent (empty or unparseable URL). Every network or server problem comes
    /// back as [`FetchOutcome::Failure`].
    pub async fn fetch(&self, url: &str, config: &RequestConfig) -> Result<FetchOutcome> {
        if url.trim().is_empty() {
            return Err(Error::invalid_value("url", "must not be empty"));
        }
        let full_url = self.build_url(url);
        url::Url::parse(&full_url)?;

        let timeout = config.timeout.unwrap_or(self.config.timeout);

        if let Some(ref limiter) = self.rate_limiter {
            limiter.wait().await;
        }

        let mut req = self.client.get(&full_url);

        for (key, value) in &self.config.default_headers {
            req = req.header(key.as_str(), value.as_str());
        }
        for (key, value) in &config.headers {
            req = req.header(key.as_str(), value.as_str());
        }
        if !config.query.is_empty() {
            req = req.query(&config.query);
        }
        req = self.api_key.apply(req).timeout(timeout);

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) if e.is_builder() => return Err(Error::Http(e)),
            Err(e) => return Ok(FetchOutcome::Failure(classify_transport_error(&e))),
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = extract_retry_after(&response);
            let body = response.text().await.unwrap_or_default();
            debug!("Request failed: GET {} -> {}", full_url, status.as_u16());
            return Ok(FetchOutcome::Failure(
                FetchFailure::new(FailureKind::HttpStatus(status.as_u16()), truncate(&body))
                    .with_retry_after(retry_after),
            ));
        }

        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return Ok(FetchOutcome::Failure(classify_transport_error(&e))),
        };

        match serde_json::from_str::<Value>(&text) {
            Ok(body) => {
                debug!("Request succeeded: GET {}", full_url);
                Ok(FetchOutcome::Success {
                    status: status.as_u16(),
                    body,
                })
            }
            Err(e) => Ok(FetchOutcome::Failure(FetchFailure::decode(format!(
                "Failed to parse JSON: {e}"
            )))),
        }
    }

    /// Build full URL from path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.config.base_url {
            Some(base) => {
                let base = base.trim_end_matches('/');
                let path = path.trim_start_matches('/');
                format!("{base}/{path}")
            }
            None => path.to_string(),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("config", &self.config)
            .field("api_key", &self.api_key)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

fn classify_transport_error(e: &reqwest::Error) -> FetchFailure {
    let kind = if e.is_timeout() {
        FailureKind::Timeout
    } else {
        FailureKind::Network
    };
    FetchFailure::new(kind, e.to_string())
}

/// Extract retry-after header value (seconds form only)
fn extract_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_DETAIL_LEN {
        return body.to_string();
    }
    let mut end = MAX_DETAIL_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

//! HTTP client module
//!
//! Provides the rate-limited, authenticated single-GET primitive.
//!
//! # Features
//!
//! - **Rate Limiting**: Minimum-interval gate using governor
//! - **API Key Auth**: Query parameter or header placement
//! - **Classification**: Every response becomes a typed `FetchOutcome`

mod auth;
mod client;
mod rate_limit;
mod types;

pub use auth::{ApiKey, Location};
pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig, DEFAULT_MIN_INTERVAL};
pub use types::{FailureKind, FetchFailure, FetchOutcome};

//! Retry policy for page fetches
//!
//! The HTTP client never retries; every caller that wants transient failures
//! absorbed goes through [`fetch_with_retry`].

use crate::error::{Error, Result};
use crate::http::{FetchFailure, FetchOutcome, HttpClient, RequestConfig};
use crate::types::{BackoffType, JsonValue};
use std::time::Duration;
use tracing::warn;

/// How transient failures are retried
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per request, first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound for any delay, `Retry-After` included
    pub max_backoff: Duration,
    /// How the delay grows between retries
    pub backoff_type: BackoffType,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_type: BackoffType::Exponential,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with default backoff
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self::new(1)
    }

    /// Set backoff configuration
    #[must_use]
    pub fn with_backoff(mut self, backoff_type: BackoffType, initial: Duration, max: Duration) -> Self {
        self.backoff_type = backoff_type;
        self.initial_backoff = initial;
        self.max_backoff = max;
        self
    }

    /// Calculate backoff delay before retry number `retry` (zero-based)
    pub fn calculate_backoff(&self, retry: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_backoff,
            BackoffType::Linear => self.initial_backoff.saturating_mul(retry + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(retry);
                self.initial_backoff.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_backoff)
    }

    /// Delay before the next attempt, honoring a server `Retry-After`
    pub fn delay_for(&self, retry: u32, failure: &FetchFailure) -> Duration {
        match failure.retry_after {
            Some(requested) => std::cmp::min(requested, self.max_backoff),
            None => self.calculate_backoff(retry),
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// A value obtained after some number of retries
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    /// The parsed value
    pub value: T,
    /// Retries it took (0 = first attempt succeeded)
    pub retries: u32,
}

/// Fetch `url` until `parse` accepts the body or the policy gives up
///
/// `parse` may reject a 2xx body with a decode failure; that is retried like
/// any other transient failure. A non-retryable HTTP status ends the loop at
/// once with [`Error::FatalFetch`]; running out of attempts yields
/// [`Error::TransientFetch`]. `page` only labels the error.
pub async fn fetch_with_retry<T, F>(
    client: &HttpClient,
    url: &str,
    request: &RequestConfig,
    policy: &RetryPolicy,
    page: usize,
    parse: F,
) -> Result<Retried<T>>
where
    F: Fn(JsonValue) -> std::result::Result<T, FetchFailure>,
{
    let max_attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;

        let failure = match client.fetch(url, request).await? {
            FetchOutcome::Success { body, .. } => match parse(body) {
                Ok(value) => {
                    return Ok(Retried {
                        value,
                        retries: attempt - 1,
                    })
                }
                Err(failure) => failure,
            },
            FetchOutcome::Failure(failure) => failure,
        };

        if !failure.is_transient() {
            return Err(Error::FatalFetch {
                page,
                status: failure.kind.status().unwrap_or_default(),
                body: failure.detail,
            });
        }

        if attempt >= max_attempts {
            return Err(Error::TransientFetch {
                page,
                attempts: attempt,
                status: failure.kind.status(),
                detail: failure.to_string(),
            });
        }

        let delay = policy.delay_for(attempt - 1, &failure);
        warn!(
            "Page {} failed ({}), attempt {}/{}, retrying in {:?}",
            page, failure, attempt, max_attempts, delay
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod retry_tests {
    use super::*;
    use crate::http::FailureKind;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_type, BackoffType::Exponential);
    }

    #[test]
    fn test_calculate_backoff_exponential() {
        let policy = RetryPolicy::new(5).with_backoff(
            BackoffType::Exponential,
            Duration::from_millis(100),
            Duration::from_secs(1),
        );
        assert_eq!(policy.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_backoff(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_backoff(2), Duration::from_millis(400));
        assert_eq!(policy.calculate_backoff(10), Duration::from_secs(1));
    }

    #[test]
    fn test_calculate_backoff_linear_and_constant() {
        let linear = RetryPolicy::new(3).with_backoff(
            BackoffType::Linear,
            Duration::from_millis(100),
            Duration::from_secs(10),
        );
        assert_eq!(linear.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(linear.calculate_backoff(2), Duration::from_millis(300));

        let constant = RetryPolicy::new(3).with_backoff(
            BackoffType::Constant,
            Duration::from_millis(250),
            Duration::from_secs(10),
        );
        assert_eq!(constant.calculate_backoff(0), Duration::from_millis(250));
        assert_eq!(constant.calculate_backoff(5), Duration::from_millis(250));
    }

    #[test]
    fn test_delay_honors_retry_after_with_cap() {
        let policy = RetryPolicy::new(3).with_backoff(
            BackoffType::Constant,
            Duration::from_millis(10),
            Duration::from_secs(5),
        );

        let hinted = FetchFailure::new(FailureKind::HttpStatus(429), "")
            .with_retry_after(Some(Duration::from_secs(2)));
        assert_eq!(policy.delay_for(0, &hinted), Duration::from_secs(2));

        let too_long = FetchFailure::new(FailureKind::HttpStatus(429), "")
            .with_retry_after(Some(Duration::from_secs(600)));
        assert_eq!(policy.delay_for(0, &too_long), Duration::from_secs(5));

        let plain = FetchFailure::new(FailureKind::Timeout, "");
        assert_eq!(policy.delay_for(0, &plain), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_non_transient_status_is_fatal_after_one_attempt() {
        use crate::http::{ApiKey, HttpClientConfig};
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such page"))
            .expect(1)
            .mount(&server)
            .await;

        let config = HttpClientConfig::builder()
            .base_url(server.uri())
            .no_rate_limit()
            .build();
        let client = HttpClient::new(config, ApiKey::new("k").unwrap()).unwrap();
        let policy = RetryPolicy::new(3).with_backoff(
            BackoffType::Constant,
            Duration::from_millis(1),
            Duration::from_millis(1),
        );

        let err = fetch_with_retry(&client, "/missing", &RequestConfig::new(), &policy, 4, |body| {
            Ok::<_, FetchFailure>(body)
        })
        .await
        .unwrap_err();
        match err {
            Error::FatalFetch { page, status, body } => {
                assert_eq!(page, 4);
                assert_eq!(status, 404);
                assert_eq!(body, "no such page");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(RetryPolicy::new(0).attempts(), 1);
        assert_eq!(RetryPolicy::no_retry().attempts(), 1);
    }
}

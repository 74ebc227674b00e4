//! Rate limiting implementation
//!
//! Uses the governor crate as a minimum-interval gate: a GCRA quota with a
//! burst of one. Governor's clock may release a permit a fraction of a
//! millisecond early, so the instant of the last permit is also kept and any
//! remainder of the interval is slept off on the monotonic clock.

use governor::clock::DefaultClock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Governor};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Default spacing between two outbound requests
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for rate limiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Minimum time between two permits
    pub min_interval: Duration,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

impl RateLimiterConfig {
    /// Create a new rate limiter config
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    /// Create config from a millisecond interval
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    /// Equivalent requests-per-second ceiling
    pub fn requests_per_second(&self) -> Option<f64> {
        if self.min_interval.is_zero() {
            None
        } else {
            Some(1.0 / self.min_interval.as_secs_f64())
        }
    }
}

/// Minimum-interval rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<Governor<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>>,
    last_permit: Arc<Mutex<Option<Instant>>>,
    min_interval: Duration,
}

impl RateLimiter {
    /// Create a new rate limiter with the given config
    ///
    /// A zero interval yields a limiter that never blocks.
    pub fn new(config: &RateLimiterConfig) -> Self {
        let quota = Quota::with_period(config.min_interval)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX))
            .allow_burst(NonZeroU32::MIN);

        Self {
            limiter: Arc::new(Governor::direct(quota)),
            last_permit: Arc::new(Mutex::new(None)),
            min_interval: config.min_interval,
        }
    }

    /// Create a rate limiter with default settings
    pub fn default_limiter() -> Self {
        Self::new(&RateLimiterConfig::default())
    }

    /// The configured spacing between permits
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until a request can be made, returning the permit instant
    ///
    /// The returned instant is at least `min_interval` after the previous
    /// permit. Concurrent waiters are served one at a time.
    pub async fn wait(&self) -> Instant {
        let mut last = self.last_permit.lock().await;
        self.limiter.until_ready().await;

        if let Some(prev) = *last {
            loop {
                let elapsed = prev.elapsed();
                if elapsed >= self.min_interval {
                    break;
                }
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        let now = Instant::now();
        *last = Some(now);
        now
    }

    /// Try to acquire a permit, returning immediately
    pub fn try_acquire(&self) -> bool {
        let Ok(mut last) = self.last_permit.try_lock() else {
            return false;
        };
        if last.is_some_and(|prev| prev.elapsed() < self.min_interval) {
            return false;
        }
        if self.limiter.check().is_err() {
            return false;
        }
        *last = Some(Instant::now());
        true
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::default_limiter()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval", &self.min_interval)
            .finish()
    }
}

#[cfg(test)]
mod rate_limit_tests {
    use super::*;

    #[test]
    fn test_rate_limiter_config_default() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.min_interval, Duration::from_millis(100));
        let rps = config.requests_per_second().unwrap();
        assert!((rps - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rate_limiter_config_zero() {
        let config = RateLimiterConfig::from_millis(0);
        assert!(config.requests_per_second().is_none());
    }

    #[tokio::test]
    async fn test_first_permit_is_immediate() {
        let limiter = RateLimiter::new(&RateLimiterConfig::from_millis(500));
        assert!(limiter.try_acquire());
        // Second permit inside the interval is refused
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_wait_spaces_consecutive_calls() {
        let interval = Duration::from_millis(50);
        let limiter = RateLimiter::new(&RateLimiterConfig::new(interval));

        let mut stamps = Vec::new();
        for _ in 0..20 {
            stamps.push(limiter.wait().await);
        }

        for pair in stamps.windows(2) {
            let gap = pair[1].duration_since(pair[0]);
            assert!(gap >= interval, "gap {gap:?} shorter than {interval:?}");
        }
    }

    #[tokio::test]
    async fn test_wait_spacing_holds_for_shared_clones() {
        let interval = Duration::from_millis(30);
        let limiter = RateLimiter::new(&RateLimiterConfig::new(interval));
        let other = limiter.clone();

        let mut stamps = Vec::new();
        for i in 0..10 {
            let permit = if i % 2 == 0 {
                limiter.wait().await
            } else {
                other.wait().await
            };
            stamps.push(permit);
        }

        for pair in stamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }

    #[tokio::test]
    async fn test_try_acquire_respects_last_wait() {
        let limiter = RateLimiter::new(&RateLimiterConfig::from_millis(200));
        limiter.wait().await;
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn test_zero_interval_never_blocks() {
        let limiter = RateLimiter::new(&RateLimiterConfig::from_millis(0));
        let start = Instant::now();
        for _ in 0..50 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(500));
    }
}

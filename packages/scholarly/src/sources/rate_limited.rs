//! Rate-limited source wrapper.
//!
//! Wraps any [`PaperSource`] with per-source call throttling (governor) and
//! bounded exponential-backoff retries. The limiter state is shared via
//! `Arc`, so concurrent requests hitting the same source contend on one
//! process-wide budget.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{SourceError, SourceResult};
use crate::traits::source::PaperSource;
use crate::types::Paper;

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Retry policy for a throttled source.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum attempts before the source is excluded for this request.
    pub max_attempts: u32,
    /// Base delay; attempt `n` waits `base * 2^n`.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before the given retry attempt (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

/// A source wrapper that enforces a minimum inter-call delay and retries
/// transient failures with exponential backoff.
pub struct RateLimitedSource<S: PaperSource> {
    inner: S,
    limiter: Arc<DefaultRateLimiter>,
    retry: RetryPolicy,
}

impl<S: PaperSource> RateLimitedSource<S> {
    /// Create with a sustained requests-per-second rate and default retries.
    pub fn new(source: S, requests_per_second: u32) -> Self {
        let quota = Quota::per_second(
            NonZeroU32::new(requests_per_second).expect("requests_per_second must be > 0"),
        );
        Self {
            inner: source,
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry: RetryPolicy::default(),
        }
    }

    /// Create with a minimum delay between calls.
    pub fn with_min_interval(source: S, interval: Duration) -> Self {
        let quota = Quota::with_period(interval)
            .unwrap_or_else(|| Quota::per_second(nonzero!(1u32)));
        Self {
            inner: source,
            limiter: Arc::new(RateLimiter::direct(quota)),
            retry: RetryPolicy::default(),
        }
    }

    /// Set the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[async_trait]
impl<S: PaperSource> PaperSource for RateLimitedSource<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn search(&self, query: &str, limit: usize) -> SourceResult<Vec<Paper>> {
        let mut attempt = 0u32;
        loop {
            self.wait_for_permit().await;

            match self.inner.search(query, limit).await {
                Ok(papers) => return Ok(papers),
                Err(e) if e.is_retryable() && attempt + 1 < self.retry.max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        source = self.inner.name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "source call failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        source = self.inner.name(),
                        attempts = attempt + 1,
                        error = %e,
                        "source excluded for this request"
                    );
                    return Err(SourceError::RetriesExhausted {
                        attempts: attempt + 1,
                    });
                }
            }
        }
    }
}

/// Extension trait for easy throttling.
pub trait SourceExt: PaperSource + Sized {
    /// Wrap this source with rate limiting.
    fn rate_limited(self, requests_per_second: u32) -> RateLimitedSource<Self> {
        RateLimitedSource::new(self, requests_per_second)
    }

    /// Wrap with a minimum inter-call delay.
    fn throttled(self, interval: Duration) -> RateLimitedSource<Self> {
        RateLimitedSource::with_min_interval(self, interval)
    }
}

impl<S: PaperSource + Sized> SourceExt for S {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockSource;
    use std::time::Instant;

    #[tokio::test]
    async fn throttles_successive_calls() {
        let mock = MockSource::new("throttled").with_papers(vec![Paper::new(
            "1",
            "Paper",
            "throttled",
        )]);
        // 2 calls per second
        let source = mock.rate_limited(2);

        let start = Instant::now();
        for _ in 0..3 {
            source.search("q", 5).await.unwrap();
        }
        let elapsed = start.elapsed();

        // First call is immediate, the next two wait for permits.
        assert!(
            elapsed.as_millis() >= 500,
            "rate limiting not applied: {:?}",
            elapsed
        );
    }

    #[tokio::test]
    async fn exhausts_retry_budget_on_persistent_failure() {
        let mock = MockSource::new("down").failing();
        let source = mock.rate_limited(100).with_retry(RetryPolicy {
            max_attempts: 2,
            backoff_base: Duration::from_millis(1),
        });

        let err = source.search("q", 5).await.unwrap_err();
        match err {
            SourceError::RetriesExhausted { attempts } => assert_eq!(attempts, 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let mock = MockSource::new("flaky")
            .with_papers(vec![Paper::new("1", "Paper", "flaky")])
            .failing_times(1);
        let source = mock.rate_limited(100).with_retry(RetryPolicy {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1),
        });

        let papers = source.search("q", 5).await.unwrap();
        assert_eq!(papers.len(), 1);
    }

    #[test]
    fn backoff_is_exponential() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff_base: Duration::from_millis(100),
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    }
}

//! Retry policy and runtime helpers used by collection fetches.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};

/// Retry configuration for collection fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Retries after the first attempt for retryable gateway errors.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for any single retry delay.
    pub max_backoff: Duration,
    /// Minimum time a failed entry waits before a read fetches it again.
    pub error_retry_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
            error_retry_interval: Duration::from_secs(5),
        }
    }
}

impl CacheConfig {
    /// Exponential base delay before retry number `attempt` (one-based).
    #[must_use]
    pub fn retry_base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }

    /// Whether an entry that failed at `failed_at` may be fetched again.
    #[must_use]
    pub fn error_retry_due(&self, failed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(failed_at)
            .to_std()
            .is_ok_and(|elapsed| elapsed >= self.error_retry_interval)
    }
}

/// Async sleeping abstraction for retries.
#[async_trait]
pub trait FetchSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Retry backoff jitter abstraction.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay from the exponential base delay.
    ///
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use ledger_client::domain::BackoffJitter;
    /// use std::time::Duration;
    /// struct DeterministicJitter;
    /// impl BackoffJitter for DeterministicJitter {
    ///     fn jittered_delay(&self, base: Duration, attempt: u32, _now: chrono::DateTime<Utc>) -> Duration {
    ///         base + Duration::from_millis(u64::from(attempt) * 5)
    ///     }
    /// }
    /// let now = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).single().expect("valid time");
    /// let delay = DeterministicJitter.jittered_delay(Duration::from_millis(100), 2, now);
    /// assert_eq!(delay, Duration::from_millis(110));
    /// ```
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Runtime helpers used by the retry loop.
#[derive(Clone)]
pub struct CacheRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn FetchSleeper>,
    /// Jitter strategy for retry delays.
    pub jitter: Arc<dyn BackoffJitter>,
    /// Source of the current time for jitter seeds and error retry spacing.
    pub clock: Arc<dyn Clock + Send + Sync>,
}

impl Default for CacheRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
            clock: Arc::new(DefaultClock),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl FetchSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Default deterministic jitter adding up to a quarter of the base delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms >> 2).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = seed.checked_rem(max_extra.saturating_add(1)).unwrap_or_default();
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

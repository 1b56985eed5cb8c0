//! Bounded retries and caller deadlines for store calls.
//!
//! Read paths retry transient store failures with jittered exponential
//! backoff. Sleeping and jitter sit behind traits so tests run without
//! wall-clock delays.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::{Clock, DefaultClock};
use tracing::warn;

use super::Error;

/// Errors that can tell whether a retry may succeed.
pub trait TransientError {
    /// True for failures such as dropped connections or pool exhaustion.
    fn is_transient(&self) -> bool;
}

/// Async sleep abstraction.
///
/// # Examples
/// ```
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use birdwatch::domain::Sleeper;
///
/// #[derive(Default)]
/// struct CountingSleeper {
///     calls: AtomicUsize,
/// }
///
/// #[async_trait]
/// impl Sleeper for CountingSleeper {
///     async fn sleep(&self, _duration: Duration) {
///         self.calls.fetch_add(1, Ordering::SeqCst);
///     }
/// }
/// ```
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Suspend for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Tokio-based sleeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Retry delay jitter.
pub trait BackoffJitter: Send + Sync {
    /// Return a jittered delay derived from the exponential base delay.
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration;
}

/// Adds up to a quarter of the base delay, seeded from the clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttemptJitter;

impl BackoffJitter for AttemptJitter {
    fn jittered_delay(&self, base: Duration, attempt: u32, now: DateTime<Utc>) -> Duration {
        let base_ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let max_extra = (base_ms / 4).max(1);
        let seed = u64::from(now.timestamp_subsec_nanos()) ^ u64::from(attempt);
        let extra = seed % max_extra.saturating_add(1);
        Duration::from_millis(base_ms.saturating_add(extra))
    }
}

/// Attempt budget and backoff bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first; values below 1 count as 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default backoff and `max_attempts` attempts.
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Un-jittered delay before retry number `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exponent = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let base_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_backoff.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }
}

/// Runtime helpers used by [`Retrier`].
#[derive(Clone)]
pub struct RetryRuntime {
    pub clock: Arc<dyn Clock>,
    pub sleeper: Arc<dyn Sleeper>,
    pub jitter: Arc<dyn BackoffJitter>,
}

impl Default for RetryRuntime {
    fn default() -> Self {
        Self {
            clock: Arc::new(DefaultClock),
            sleeper: Arc::new(TokioSleeper),
            jitter: Arc::new(AttemptJitter),
        }
    }
}

/// Runs an operation until it succeeds, fails permanently, or the attempt
/// budget runs out.
#[derive(Clone)]
pub struct Retrier {
    policy: RetryPolicy,
    runtime: RetryRuntime,
}

impl Default for Retrier {
    fn default() -> Self {
        Self::new(RetryPolicy::default(), RetryRuntime::default())
    }
}

impl Retrier {
    pub fn new(policy: RetryPolicy, runtime: RetryRuntime) -> Self {
        Self { policy, runtime }
    }

    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retry `operation` while it fails with a transient error.
    ///
    /// The last error is returned once attempts are exhausted.
    pub async fn run<T, E, F, Fut>(&self, operation: &'static str, mut call: F) -> Result<T, E>
    where
        T: Send,
        E: TransientError + std::fmt::Display + Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match call().await {
                Err(error) if error.is_transient() && attempt < max_attempts => {
                    let delay = self.runtime.jitter.jittered_delay(
                        self.policy.base_delay(attempt),
                        attempt,
                        self.runtime.clock.utc(),
                    );
                    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    warn!(operation, attempt, delay_ms, %error, "retrying store call");
                    self.runtime.sleeper.sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

/// Bound `future` by an optional caller deadline.
///
/// Expiry drops the future, which cancels any in-flight statement and rolls
/// back an open transaction.
pub async fn with_deadline<T, Fut>(deadline: Option<Duration>, future: Fut) -> Result<T, Error>
where
    Fut: Future<Output = Result<T, Error>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, future).await.unwrap_or_else(|_| {
            Err(Error::service_unavailable(format!(
                "request exceeded its {}ms deadline",
                limit.as_millis()
            )))
        }),
        None => future.await,
    }
}

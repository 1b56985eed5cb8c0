//! Timer task driving the bird-of-the-day rotation.
//!
//! One scheduler runs per deployment. Each tick reads when the rotation last
//! advanced and either advances now or sleeps until the interval has passed,
//! so restarts neither skip nor double a day. Transient failures are retried
//! with jittered backoff; configuration errors stop the task.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::{error, info, warn};

use crate::domain::ports::BirdOfTheDayRotation;
use crate::domain::{BackoffJitter, BirdId, Error, ErrorCode, RetryPolicy, Sleeper};

/// Scheduler timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between advances.
    pub interval: Duration,
    /// Backoff for failed ticks. `max_attempts` bounds one-shot runs only;
    /// the long-running loop keeps retrying at `max_backoff`.
    pub retry: RetryPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60),
            retry: RetryPolicy {
                max_attempts: 5,
                initial_backoff: Duration::from_secs(1),
                max_backoff: Duration::from_secs(5 * 60),
            },
        }
    }
}

/// Result of one scheduler tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The rotation advanced to this bird.
    Advanced(BirdId),
    /// Nothing to do yet; the next advance is due after `wait`.
    NotDue { wait: Duration },
}

/// Time left before an advance is due. Zero means due now.
fn time_until_due(
    last_rotated_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    interval: Duration,
) -> Duration {
    let Some(last) = last_rotated_at else {
        return Duration::ZERO;
    };
    // A timestamp ahead of the clock counts as "just rotated".
    let elapsed = (now - last).to_std().unwrap_or(Duration::ZERO);
    interval.saturating_sub(elapsed)
}

fn is_fatal(error: &Error) -> bool {
    matches!(error.code(), ErrorCode::Misconfigured)
}

/// Runtime helpers for [`RotationScheduler`].
pub struct SchedulerRuntime {
    pub clock: Arc<dyn Clock>,
    pub sleeper: Arc<dyn Sleeper>,
    pub jitter: Arc<dyn BackoffJitter>,
}

/// Long-running rotation task.
pub struct RotationScheduler<S> {
    rotation: Arc<S>,
    runtime: SchedulerRuntime,
    config: SchedulerConfig,
}

impl<S> RotationScheduler<S>
where
    S: BirdOfTheDayRotation,
{
    pub fn new(rotation: Arc<S>, runtime: SchedulerRuntime, config: SchedulerConfig) -> Self {
        Self {
            rotation,
            runtime,
            config,
        }
    }

    /// Advance if due, otherwise report how long to wait.
    pub async fn tick(&self) -> Result<TickOutcome, Error> {
        let last = self.rotation.last_rotated_at().await?;
        let wait = time_until_due(last, self.runtime.clock.utc(), self.config.interval);
        if !wait.is_zero() {
            return Ok(TickOutcome::NotDue { wait });
        }
        let bird_id = self.rotation.advance_bird_of_the_day().await?;
        Ok(TickOutcome::Advanced(bird_id))
    }

    /// Advance once regardless of schedule, retrying transient failures.
    pub async fn advance_now(&self) -> Result<BirdId, Error> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.rotation.advance_bird_of_the_day().await {
                Err(err) if !is_fatal(&err) && attempt < max_attempts => {
                    warn!(attempt, error = %err, "bird of the day advance failed; retrying");
                    self.backoff(attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Tick until `shutdown` resolves or a configuration error occurs.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), Error>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut failures = 0_u32;
        loop {
            let wait = match self.tick().await {
                Ok(TickOutcome::Advanced(bird_id)) => {
                    failures = 0;
                    info!(bird_id = bird_id.get(), "scheduled rotation complete");
                    self.config.interval
                }
                Ok(TickOutcome::NotDue { wait }) => {
                    failures = 0;
                    wait
                }
                Err(err) if is_fatal(&err) => {
                    error!(error = %err, "bird of the day scheduler stopping");
                    return Err(err);
                }
                Err(err) => {
                    failures = failures.saturating_add(1);
                    warn!(attempt = failures, error = %err, "scheduled rotation failed");
                    self.retry_delay(failures)
                }
            };

            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!("bird of the day scheduler shutting down");
                    return Ok(());
                }
                () = self.runtime.sleeper.sleep(wait) => {}
            }
        }
    }

    fn retry_delay(&self, attempt: u32) -> Duration {
        self.runtime.jitter.jittered_delay(
            self.config.retry.base_delay(attempt),
            attempt,
            self.runtime.clock.utc(),
        )
    }

    async fn backoff(&self, attempt: u32) {
        self.runtime.sleeper.sleep(self.retry_delay(attempt)).await;
    }
}

#[cfg(test)]
#[path = "bird_of_the_day_scheduler_tests.rs"]
mod tests;

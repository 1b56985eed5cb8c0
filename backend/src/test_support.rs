//! Test utilities for the birdwatch crate.
//!
//! Shared by unit tests (in `src/`) and integration tests (in `tests/`).
//! Compiled for `cfg(test)` and the `test-support` feature only.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, Utc};
use mockable::Clock;
use tokio::sync::Notify;

use crate::domain::{
    BackoffJitter, Retrier, RetryPolicy, RetryRuntime, Sleeper,
};

/// Clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixtureClock(pub DateTime<Utc>);

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock that tests move forward by hand.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Sleeper that returns at once.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl Sleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records requested durations and returns at once.
///
/// Optionally signals a [`Notify`] on every sleep, which lets a test stop a
/// loop after its first wait.
#[derive(Default)]
pub struct RecordingSleeper {
    durations: Mutex<Vec<Duration>>,
    notify: Option<Arc<Notify>>,
}

impl RecordingSleeper {
    pub fn notifying(notify: Arc<Notify>) -> Self {
        Self {
            durations: Mutex::default(),
            notify: Some(notify),
        }
    }

    pub fn recorded(&self) -> Vec<Duration> {
        match self.durations.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => panic!("sleeper mutex"),
        }
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        match self.durations.lock() {
            Ok(mut entries) => entries.push(duration),
            Err(_) => panic!("sleeper mutex"),
        }
        if let Some(notify) = &self.notify {
            notify.notify_one();
        }
    }
}

/// Jitter strategy returning the base delay unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl BackoffJitter for NoJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        base
    }
}

/// Retrier with `max_attempts` attempts that never waits.
pub fn immediate_retrier(max_attempts: u32) -> Retrier {
    Retrier::new(
        RetryPolicy::with_attempts(max_attempts),
        RetryRuntime {
            clock: Arc::new(mockable::DefaultClock),
            sleeper: Arc::new(ImmediateSleeper),
            jitter: Arc::new(NoJitter),
        },
    )
}

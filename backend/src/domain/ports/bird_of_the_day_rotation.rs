//! Driving port for the bird-of-the-day rotation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Bird, BirdId, Error};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BirdOfTheDayRotation: Send + Sync {
    /// The currently featured bird.
    ///
    /// Fails with `misconfigured` before the first advance or when the
    /// singleton row is missing.
    async fn current_bird_of_the_day(&self) -> Result<Bird, Error>;

    /// Move the rotation forward one step and return the new bird's id.
    ///
    /// Meant for the scheduler; safe to call concurrently.
    async fn advance_bird_of_the_day(&self) -> Result<BirdId, Error>;

    /// When the rotation last advanced, if ever.
    async fn last_rotated_at(&self) -> Result<Option<DateTime<Utc>>, Error>;
}

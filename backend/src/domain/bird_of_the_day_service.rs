//! Bird-of-the-day rotation service.
//!
//! An advance loads the singleton row, computes the next [`RotationState`]
//! in memory and writes it back conditionally on the revision it read. A
//! stale revision means a concurrent advance won; the whole transition is
//! then redone from a fresh read, so overlapping advances serialise.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};

use crate::domain::ports::{
    BirdOfTheDayRepository, BirdOfTheDayRepositoryError, BirdOfTheDayRotation, BirdRepository,
    BirdRepositoryError,
};
use crate::domain::{
    Bird, BirdId, BirdPopulation, Error, Retrier, RotationRecord, RotationState,
};

/// Compare-and-swap attempts before an advance gives up with `conflict`.
pub const ROTATION_SAVE_ATTEMPTS: u32 = 5;

fn map_bird_error(error: BirdRepositoryError) -> Error {
    match error {
        BirdRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("bird repository unavailable: {message}"))
        }
        BirdRepositoryError::Query { message } => {
            Error::internal(format!("bird repository error: {message}"))
        }
    }
}

fn map_rotation_error(error: BirdOfTheDayRepositoryError) -> Error {
    match error {
        BirdOfTheDayRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("bird of the day store unavailable: {message}"))
        }
        BirdOfTheDayRepositoryError::Query { message } => {
            Error::internal(format!("bird of the day store error: {message}"))
        }
        BirdOfTheDayRepositoryError::Missing => {
            Error::misconfigured("bird of the day row is missing; seed data incomplete")
        }
        BirdOfTheDayRepositoryError::RevisionMismatch { expected } => Error::conflict(format!(
            "bird of the day revision {expected} was superseded"
        )),
    }
}

/// Service implementing [`BirdOfTheDayRotation`].
pub struct BirdOfTheDayService<B, R> {
    bird_repo: Arc<B>,
    rotation_repo: Arc<R>,
    clock: Arc<dyn Clock>,
    rng: Mutex<SmallRng>,
    retrier: Retrier,
}

impl<B, R> BirdOfTheDayService<B, R> {
    /// Create a service drawing randomness from OS entropy.
    pub fn new(
        bird_repo: Arc<B>,
        rotation_repo: Arc<R>,
        clock: Arc<dyn Clock>,
        retrier: Retrier,
    ) -> Self {
        Self {
            bird_repo,
            rotation_repo,
            clock,
            rng: Mutex::new(SmallRng::from_entropy()),
            retrier,
        }
    }

    /// Replace the random source, e.g. with a seeded one in tests.
    #[must_use]
    pub fn with_rng(mut self, rng: SmallRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }
}

impl<B, R> BirdOfTheDayService<B, R>
where
    B: BirdRepository,
    R: BirdOfTheDayRepository,
{
    async fn population(&self) -> Result<BirdPopulation, Error> {
        let repo = &self.bird_repo;
        let ids = self
            .retrier
            .run("bird_ids", || repo.bird_ids())
            .await
            .map_err(map_bird_error)?;
        BirdPopulation::from_ids(ids)
            .map_err(|err| Error::misconfigured(format!("bird population unusable: {err}")))
    }

    async fn load(&self) -> Result<RotationRecord, Error> {
        let repo = &self.rotation_repo;
        self.retrier
            .run("load_bird_of_the_day", || repo.load())
            .await
            .map_err(map_rotation_error)
    }

    fn next_state(
        &self,
        record: &RotationRecord,
        population: &BirdPopulation,
    ) -> Result<(RotationState, BirdId), Error> {
        let mut state = record.state.clone();
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| Error::internal("rotation rng lock poisoned"))?;
        let next = state.advance(population, &mut *rng);
        Ok((state, next))
    }
}

#[async_trait]
impl<B, R> BirdOfTheDayRotation for BirdOfTheDayService<B, R>
where
    B: BirdRepository,
    R: BirdOfTheDayRepository,
{
    async fn current_bird_of_the_day(&self) -> Result<Bird, Error> {
        let record = self.load().await?;
        let id = record.state.current.ok_or_else(|| {
            Error::misconfigured("bird of the day has not been selected yet")
        })?;
        let repo = &self.bird_repo;
        self.retrier
            .run("find_bird", || repo.find_by_id(id))
            .await
            .map_err(map_bird_error)?
            .ok_or_else(|| Error::misconfigured(format!("featured bird {id} does not exist")))
    }

    async fn advance_bird_of_the_day(&self) -> Result<BirdId, Error> {
        let population = self.population().await?;

        for attempt in 1..=ROTATION_SAVE_ATTEMPTS {
            let record = self.load().await?;
            let (state, next) = self.next_state(&record, &population)?;

            match self
                .rotation_repo
                .save(&state, self.clock.utc(), record.revision)
                .await
            {
                Ok(saved) => {
                    info!(
                        bird_id = next.get(),
                        revision = saved.revision,
                        backlog = saved.state.backlog.len(),
                        "bird of the day advanced"
                    );
                    return Ok(next);
                }
                Err(BirdOfTheDayRepositoryError::RevisionMismatch { expected }) => {
                    warn!(
                        attempt,
                        revision = expected,
                        "concurrent bird of the day advance; retrying"
                    );
                }
                Err(other) => return Err(map_rotation_error(other)),
            }
        }

        Err(Error::conflict("bird of the day kept changing during the advance"))
    }

    async fn last_rotated_at(&self) -> Result<Option<DateTime<Utc>>, Error> {
        Ok(self.load().await?.rotated_at)
    }
}

#[cfg(test)]
#[path = "bird_of_the_day_service_tests.rs"]
mod tests;

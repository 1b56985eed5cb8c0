//! PostgreSQL-backed bird-of-the-day row.
//!
//! Saves are a single `UPDATE ... WHERE id = 1 AND revision = $expected`.
//! Zero affected rows means either the row is missing or another writer got
//! there first; a follow-up read tells the two apart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{BirdOfTheDayRepository, BirdOfTheDayRepositoryError};
use crate::domain::{RotationRecord, RotationState};

use super::diesel_helpers::{map_basic_diesel_error, map_pool_error};
use super::models::{BirdOfTheDayRow, BirdOfTheDayUpdate};
use super::pool::DbPool;
use super::schema::bird_of_the_day;

/// Primary key of the singleton row.
const ROW_ID: i32 = 1;

/// Diesel-backed [`BirdOfTheDayRepository`].
#[derive(Clone)]
pub struct DieselBirdOfTheDayRepository {
    pool: DbPool,
}

impl DieselBirdOfTheDayRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> BirdOfTheDayRepositoryError {
    map_basic_diesel_error(
        error,
        operation,
        BirdOfTheDayRepositoryError::connection,
        BirdOfTheDayRepositoryError::query,
    )
}

fn to_record(row: BirdOfTheDayRow) -> Result<RotationRecord, BirdOfTheDayRepositoryError> {
    RotationRecord::try_from(row).map_err(BirdOfTheDayRepositoryError::query)
}

/// Explain a zero-row save from the revision currently stored.
fn stale_or_missing(current: Option<i32>, expected: i32) -> BirdOfTheDayRepositoryError {
    match current {
        Some(_) => BirdOfTheDayRepositoryError::revision_mismatch(expected),
        None => BirdOfTheDayRepositoryError::missing(),
    }
}

#[async_trait]
impl BirdOfTheDayRepository for DieselBirdOfTheDayRepository {
    async fn load(&self) -> Result<RotationRecord, BirdOfTheDayRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, BirdOfTheDayRepositoryError::connection))?;
        let row = bird_of_the_day::table
            .find(ROW_ID)
            .select(BirdOfTheDayRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "bird of the day load"))?;
        row.map_or_else(|| Err(BirdOfTheDayRepositoryError::missing()), to_record)
    }

    async fn save(
        &self,
        state: &RotationState,
        rotated_at: DateTime<Utc>,
        expected_revision: i32,
    ) -> Result<RotationRecord, BirdOfTheDayRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, BirdOfTheDayRepositoryError::connection))?;
        let changes =
            BirdOfTheDayUpdate::new(state, rotated_at, expected_revision.saturating_add(1));

        let saved = diesel::update(
            bird_of_the_day::table
                .filter(bird_of_the_day::id.eq(ROW_ID))
                .filter(bird_of_the_day::revision.eq(expected_revision)),
        )
        .set(&changes)
        .returning(BirdOfTheDayRow::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(|err| map_diesel_error(err, "bird of the day save"))?;

        if let Some(row) = saved {
            return to_record(row);
        }

        let current: Option<i32> = bird_of_the_day::table
            .find(ROW_ID)
            .select(bird_of_the_day::revision)
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "bird of the day revision check"))?;
        Err(stale_or_missing(current, expected_revision))
    }
}

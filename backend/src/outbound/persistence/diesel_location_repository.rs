//! PostgreSQL-backed location writes.
//!
//! Upsert is `INSERT ... ON CONFLICT (user_id, name) DO NOTHING` followed by
//! a read of the keyed row, so an existing location is returned unchanged.
//! Relocation runs the upsert and the sighting re-point in one transaction;
//! dropping the future mid-way rolls both back. The only foreign key a
//! location insert can break is `locations.user_id`, so a violation there
//! reports the owner as unknown.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::QueryResult;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use diesel_async::{AsyncConnection as _, AsyncPgConnection, RunQueryDsl};
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{LocationRepository, LocationRepositoryError, Relocation};
use crate::domain::{Location, LocationDraft, LocationId, UserId};

use super::diesel_helpers::{FailureKind, classify_diesel_error, map_pool_error};
use super::models::{LocationRow, NewLocationRow};
use super::pool::DbPool;
use super::schema::{locations, sightings};

/// Diesel-backed [`LocationRepository`].
#[derive(Clone)]
pub struct DieselLocationRepository {
    pool: DbPool,
}

impl DieselLocationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(
    error: diesel::result::Error,
    operation: &str,
    user_id: &UserId,
) -> LocationRepositoryError {
    match classify_diesel_error(&error, operation) {
        FailureKind::Connection => LocationRepositoryError::connection(error.to_string()),
        FailureKind::Conflict => LocationRepositoryError::conflict(error.to_string()),
        FailureKind::MissingReference => LocationRepositoryError::unknown_user(user_id.to_string()),
        FailureKind::Query => LocationRepositoryError::query(error.to_string()),
    }
}

fn to_location(row: LocationRow) -> Result<Location, LocationRepositoryError> {
    Location::try_from(row).map_err(LocationRepositoryError::query)
}

fn to_count(rows: usize) -> u64 {
    u64::try_from(rows).unwrap_or(u64::MAX)
}

/// Insert the keyed row if absent and read it back.
async fn upsert_row(
    conn: &mut AsyncPgConnection,
    user_id: Uuid,
    draft: &LocationDraft,
) -> QueryResult<LocationRow> {
    let new_row = NewLocationRow {
        id: Uuid::new_v4(),
        user_id,
        name: draft.name.as_str(),
        latitude: draft.coordinates.latitude(),
        longitude: draft.coordinates.longitude(),
    };
    diesel::insert_into(locations::table)
        .values(&new_row)
        .on_conflict((locations::user_id, locations::name))
        .do_nothing()
        .execute(conn)
        .await?;

    locations::table
        .filter(locations::user_id.eq(user_id))
        .filter(locations::name.eq(draft.name.as_str()))
        .select(LocationRow::as_select())
        .first(conn)
        .await
}

#[async_trait]
impl LocationRepository for DieselLocationRepository {
    async fn upsert(
        &self,
        user_id: &UserId,
        draft: &LocationDraft,
    ) -> Result<Location, LocationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LocationRepositoryError::connection))?;
        let user = *user_id.as_uuid();
        let row = upsert_row(&mut conn, user, draft)
            .await
            .map_err(|err| map_diesel_error(err, "location upsert", user_id))?;
        to_location(row)
    }

    async fn relocate(
        &self,
        user_id: &UserId,
        from: LocationId,
        draft: &LocationDraft,
    ) -> Result<Relocation, LocationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LocationRepositoryError::connection))?;
        let user = *user_id.as_uuid();
        let from_id = *from.as_uuid();

        let outcome = conn
            .transaction(|conn| {
                async move {
                    let owned: Option<Uuid> = locations::table
                        .filter(locations::id.eq(from_id))
                        .filter(locations::user_id.eq(user))
                        .select(locations::id)
                        .first(conn)
                        .await
                        .optional()?;
                    if owned.is_none() {
                        return Ok(None);
                    }

                    let target = upsert_row(conn, user, draft).await?;
                    let repointed = if target.id == from_id {
                        0
                    } else {
                        diesel::update(
                            sightings::table
                                .filter(sightings::user_id.eq(user))
                                .filter(sightings::location_id.eq(from_id)),
                        )
                        .set(sightings::location_id.eq(target.id))
                        .execute(conn)
                        .await?
                    };
                    Ok::<_, diesel::result::Error>(Some((target, repointed)))
                }
                .scope_boxed()
            })
            .await
            .map_err(|err| map_diesel_error(err, "location relocate", user_id))?;

        let Some((row, repointed)) = outcome else {
            return Err(LocationRepositoryError::not_found(from.to_string()));
        };
        debug!(from = %from, to = %row.id, repointed, "sightings re-pointed");
        Ok(Relocation {
            location: to_location(row)?,
            repointed: to_count(repointed),
        })
    }

    async fn unplace_sightings(
        &self,
        user_id: &UserId,
        location_id: LocationId,
    ) -> Result<u64, LocationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LocationRepositoryError::connection))?;
        let affected = diesel::update(
            sightings::table
                .filter(sightings::user_id.eq(*user_id.as_uuid()))
                .filter(sightings::location_id.eq(*location_id.as_uuid())),
        )
        .set(sightings::location_id.eq(None::<Uuid>))
        .execute(&mut conn)
        .await
        .map_err(|err| map_diesel_error(err, "location unplace", user_id))?;
        Ok(to_count(affected))
    }

    async fn find_by_id(
        &self,
        user_id: &UserId,
        location_id: LocationId,
    ) -> Result<Option<Location>, LocationRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, LocationRepositoryError::connection))?;
        let row = locations::table
            .filter(locations::id.eq(*location_id.as_uuid()))
            .filter(locations::user_id.eq(*user_id.as_uuid()))
            .select(LocationRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "location lookup", user_id))?;
        row.map(to_location).transpose()
    }
}

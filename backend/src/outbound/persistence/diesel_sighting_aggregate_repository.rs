//! PostgreSQL-backed grouped views over sightings.
//!
//! Each [`GroupBy`] has a fixed grouping statement; the order plan carried by
//! the listing is rendered from static fragments. Caller input reaches SQL
//! only as bound parameters.
//!
//! Label ordering uses `lower(label)` then `label`, both under the `"C"`
//! collation. `lower` only folds ASCII letters under `"C"`, and
//! [`compare_labels`](crate::domain::compare_labels) folds the same set, so
//! both orders agree on any UTF-8 label.

use async_trait::async_trait;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Uuid as SqlUuid};
use diesel_async::RunQueryDsl;

use crate::domain::ports::{SightingAggregateRepository, SightingAggregateRepositoryError};
use crate::domain::{
    Direction, GroupBy, LocationListing, OrderKey, OrderPlan, SightingGroup, SightingListing,
    UserId,
};

use super::diesel_helpers::{collect_rows, map_basic_diesel_error, map_pool_error};
use super::models::{BirdGroupRow, DateGroupRow, LocationGroupRow, TotalRow};
use super::pool::DbPool;

const DATE_GROUPS: &str = "
SELECT s.sighted_on AS group_key, to_char(s.sighted_on, 'YYYY-MM-DD') AS label, \
COUNT(*) AS group_count
FROM sightings s
WHERE s.user_id = $1
GROUP BY s.sighted_on";

const BIRD_GROUPS: &str = "
SELECT b.id AS group_key, b.common_name::text AS label, COUNT(*) AS group_count
FROM sightings s
JOIN birds b ON b.id = s.bird_id
WHERE s.user_id = $1
GROUP BY b.id, b.common_name";

const LOCATION_GROUPS: &str = "
SELECT l.id AS group_key, l.name::text AS label, COUNT(*) AS group_count
FROM sightings s
JOIN locations l ON l.id = s.location_id
WHERE s.user_id = $1
GROUP BY l.id, l.name";

const LOCATIONS_WITH_COUNTS: &str = "
SELECT l.id AS group_key, l.name::text AS label, COUNT(s.id) AS group_count
FROM locations l
LEFT JOIN sightings s ON s.location_id = l.id AND s.user_id = l.user_id
WHERE l.user_id = $1
GROUP BY l.id, l.name";

const COUNT_DATE_GROUPS: &str =
    "SELECT COUNT(DISTINCT sighted_on) AS total FROM sightings WHERE user_id = $1";
const COUNT_BIRD_GROUPS: &str =
    "SELECT COUNT(DISTINCT bird_id) AS total FROM sightings WHERE user_id = $1";
const COUNT_LOCATION_GROUPS: &str =
    "SELECT COUNT(DISTINCT location_id) AS total FROM sightings WHERE user_id = $1";
const COUNT_LOCATIONS: &str = "SELECT COUNT(*) AS total FROM locations WHERE user_id = $1";

const fn grouping_sql(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::Date => DATE_GROUPS,
        GroupBy::Bird => BIRD_GROUPS,
        GroupBy::Location => LOCATION_GROUPS,
    }
}

const fn count_sql(group_by: GroupBy) -> &'static str {
    match group_by {
        GroupBy::Date => COUNT_DATE_GROUPS,
        GroupBy::Bird => COUNT_BIRD_GROUPS,
        GroupBy::Location => COUNT_LOCATION_GROUPS,
    }
}

const fn direction_sql(direction: Direction) -> &'static str {
    match direction {
        Direction::Asc => "ASC",
        Direction::Desc => "DESC",
    }
}

/// Render `plan` as an `ORDER BY` list over the `groups` subquery.
fn order_by_sql(plan: OrderPlan) -> String {
    plan.iter()
        .map(|term| {
            let direction = direction_sql(term.direction);
            match term.key {
                OrderKey::Key => format!("group_key {direction}"),
                OrderKey::Count => format!("group_count {direction}"),
                OrderKey::Label => format!(
                    "lower(label COLLATE \"C\") {direction}, label COLLATE \"C\" {direction}"
                ),
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Wrap a grouping statement with ordering and the page window.
fn paged_sql(grouping: &str, plan: OrderPlan) -> String {
    format!(
        "SELECT group_key, label, group_count FROM ({grouping}) AS groups \
         ORDER BY {} LIMIT $2 OFFSET $3",
        order_by_sql(plan)
    )
}

/// Diesel-backed [`SightingAggregateRepository`].
#[derive(Clone)]
pub struct DieselSightingAggregateRepository {
    pool: DbPool,
}

impl DieselSightingAggregateRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn total(
        &self,
        sql: &'static str,
        user_id: &UserId,
        operation: &str,
    ) -> Result<u64, SightingAggregateRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SightingAggregateRepositoryError::connection))?;
        let row: TotalRow = sql_query(sql)
            .bind::<SqlUuid, _>(*user_id.as_uuid())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, operation))?;
        Ok(row.into_count())
    }
}

fn map_diesel_error(
    error: diesel::result::Error,
    operation: &str,
) -> SightingAggregateRepositoryError {
    map_basic_diesel_error(
        error,
        operation,
        SightingAggregateRepositoryError::connection,
        SightingAggregateRepositoryError::query,
    )
}

#[async_trait]
impl SightingAggregateRepository for DieselSightingAggregateRepository {
    async fn group_sightings(
        &self,
        user_id: &UserId,
        listing: &SightingListing,
    ) -> Result<Vec<SightingGroup>, SightingAggregateRepositoryError> {
        let group_by = listing.group_by();
        let window = listing.window();
        let query = sql_query(paged_sql(grouping_sql(group_by), listing.order_plan()))
            .bind::<SqlUuid, _>(*user_id.as_uuid())
            .bind::<BigInt, _>(window.limit_param())
            .bind::<BigInt, _>(window.offset_param());
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SightingAggregateRepositoryError::connection))?;

        match group_by {
            GroupBy::Date => {
                let rows: Vec<DateGroupRow> = query
                    .load(&mut conn)
                    .await
                    .map_err(|err| map_diesel_error(err, "sightings by date"))?;
                Ok(rows.into_iter().map(SightingGroup::from).collect())
            }
            GroupBy::Bird => {
                let rows: Vec<BirdGroupRow> = query
                    .load(&mut conn)
                    .await
                    .map_err(|err| map_diesel_error(err, "sightings by bird"))?;
                collect_rows(
                    rows.into_iter().map(SightingGroup::try_from),
                    SightingAggregateRepositoryError::query,
                )
            }
            GroupBy::Location => {
                let rows: Vec<LocationGroupRow> = query
                    .load(&mut conn)
                    .await
                    .map_err(|err| map_diesel_error(err, "sightings by location"))?;
                Ok(rows.into_iter().map(SightingGroup::from).collect())
            }
        }
    }

    async fn count_sighting_groups(
        &self,
        user_id: &UserId,
        group_by: GroupBy,
    ) -> Result<u64, SightingAggregateRepositoryError> {
        self.total(count_sql(group_by), user_id, "sighting group count")
            .await
    }

    async fn group_locations(
        &self,
        user_id: &UserId,
        listing: &LocationListing,
    ) -> Result<Vec<SightingGroup>, SightingAggregateRepositoryError> {
        let window = listing.window();
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, SightingAggregateRepositoryError::connection))?;
        let rows: Vec<LocationGroupRow> =
            sql_query(paged_sql(LOCATIONS_WITH_COUNTS, listing.order_plan()))
                .bind::<SqlUuid, _>(*user_id.as_uuid())
                .bind::<BigInt, _>(window.limit_param())
                .bind::<BigInt, _>(window.offset_param())
                .load(&mut conn)
                .await
                .map_err(|err| map_diesel_error(err, "locations with counts"))?;
        Ok(rows.into_iter().map(SightingGroup::from).collect())
    }

    async fn count_locations(
        &self,
        user_id: &UserId,
    ) -> Result<u64, SightingAggregateRepositoryError> {
        self.total(COUNT_LOCATIONS, user_id, "location count").await
    }
}

//! PostgreSQL-backed bird reference adapter.
//!
//! Search runs as raw SQL so the relevance rank can order the page:
//! common-name matches rank 2, family-only matches rank 1, ties break by id.
//! The term is bound as an escaped `ILIKE` pattern, never interpolated.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_query;
use diesel::sql_types::{BigInt, Text};
use diesel_async::RunQueryDsl;
use pagination::PageWindow;

use crate::domain::ports::{BirdRepository, BirdRepositoryError};
use crate::domain::{Bird, BirdId, SearchTerm};

use super::diesel_helpers::{collect_rows, map_basic_diesel_error, map_pool_error};
use super::models::{BirdRow, TotalRow};
use super::pool::DbPool;
use super::schema::birds;

const SEARCH_SQL: &str = r"
SELECT id, common_name, scientific_name, family, rarity, description, image_url, image_credit
FROM birds
WHERE common_name ILIKE $1 ESCAPE '\' OR family ILIKE $1 ESCAPE '\'
ORDER BY CASE WHEN common_name ILIKE $1 ESCAPE '\' THEN 2 ELSE 1 END DESC, id ASC
LIMIT $2 OFFSET $3
";

const COUNT_SQL: &str = r"
SELECT COUNT(*) AS total
FROM birds
WHERE common_name ILIKE $1 ESCAPE '\' OR family ILIKE $1 ESCAPE '\'
";

/// Diesel-backed [`BirdRepository`].
#[derive(Clone)]
pub struct DieselBirdRepository {
    pool: DbPool,
}

impl DieselBirdRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_diesel_error(error: diesel::result::Error, operation: &str) -> BirdRepositoryError {
    map_basic_diesel_error(
        error,
        operation,
        BirdRepositoryError::connection,
        BirdRepositoryError::query,
    )
}

#[async_trait]
impl BirdRepository for DieselBirdRepository {
    async fn search(
        &self,
        term: &SearchTerm,
        window: PageWindow,
    ) -> Result<Vec<Bird>, BirdRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, BirdRepositoryError::connection))?;
        let rows: Vec<BirdRow> = sql_query(SEARCH_SQL)
            .bind::<Text, _>(term.like_pattern())
            .bind::<BigInt, _>(window.limit_param())
            .bind::<BigInt, _>(window.offset_param())
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "bird search"))?;
        collect_rows(rows.into_iter().map(Bird::try_from), BirdRepositoryError::query)
    }

    async fn count_matching(&self, term: &SearchTerm) -> Result<u64, BirdRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, BirdRepositoryError::connection))?;
        let row: TotalRow = sql_query(COUNT_SQL)
            .bind::<Text, _>(term.like_pattern())
            .get_result(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "bird search count"))?;
        Ok(row.into_count())
    }

    async fn find_by_id(&self, id: BirdId) -> Result<Option<Bird>, BirdRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, BirdRepositoryError::connection))?;
        let row = birds::table
            .find(id.get())
            .select(BirdRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(|err| map_diesel_error(err, "bird lookup"))?;
        row.map(Bird::try_from)
            .transpose()
            .map_err(BirdRepositoryError::query)
    }

    async fn bird_ids(&self) -> Result<Vec<BirdId>, BirdRepositoryError> {
        let mut conn = self
            .pool
            .get()
            .await
            .map_err(|err| map_pool_error(err, BirdRepositoryError::connection))?;
        let ids: Vec<i32> = birds::table
            .select(birds::id)
            .order_by(birds::id)
            .load(&mut conn)
            .await
            .map_err(|err| map_diesel_error(err, "bird ids"))?;
        collect_rows(
            ids.into_iter()
                .map(|raw| BirdId::new(raw).map_err(|err| err.to_string())),
            BirdRepositoryError::query,
        )
    }
}

//! Internal Diesel row structs.
//!
//! Row types never leave the persistence layer; repositories convert them
//! into domain values and report malformed rows as query errors.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Date, Int4, Text, Uuid as SqlUuid};
use uuid::Uuid;

use crate::domain::{
    Bird, BirdId, Coordinates, GroupKey, ImageAttribution, Location, LocationId, LocationName,
    Rarity, RotationRecord, RotationState, SightingGroup, UserId,
};

use super::schema::{bird_of_the_day, birds, locations};

// ---------------------------------------------------------------------------
// Birds
// ---------------------------------------------------------------------------

/// Bird row, readable both through the DSL and from raw search SQL.
#[derive(Debug, Clone, Queryable, QueryableByName, Selectable)]
#[diesel(table_name = birds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BirdRow {
    pub id: i32,
    pub common_name: String,
    pub scientific_name: String,
    pub family: String,
    pub rarity: String,
    pub description: String,
    pub image_url: Option<String>,
    pub image_credit: Option<String>,
}

impl TryFrom<BirdRow> for Bird {
    type Error = String;

    fn try_from(row: BirdRow) -> Result<Self, Self::Error> {
        let id = BirdId::new(row.id).map_err(|err| err.to_string())?;
        let rarity = row.rarity.parse::<Rarity>().map_err(|err| format!("bird {id}: {err}"))?;
        let image = row.image_url.map(|url| ImageAttribution {
            url,
            credit: row.image_credit,
        });
        Ok(Self {
            id,
            common_name: row.common_name,
            scientific_name: row.scientific_name,
            family: row.family,
            rarity,
            description: row.description,
            image,
        })
    }
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = locations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct LocationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl TryFrom<LocationRow> for Location {
    type Error = String;

    fn try_from(row: LocationRow) -> Result<Self, Self::Error> {
        let name =
            LocationName::new(&row.name).map_err(|err| format!("location {}: {err}", row.id))?;
        let coordinates = Coordinates::new(row.latitude, row.longitude)
            .map_err(|err| format!("location {}: {err}", row.id))?;
        Ok(Self {
            id: LocationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            name,
            coordinates,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = locations)]
pub(crate) struct NewLocationRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: &'a str,
    pub latitude: f64,
    pub longitude: f64,
}

// ---------------------------------------------------------------------------
// Bird of the day
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = bird_of_the_day)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BirdOfTheDayRow {
    pub backlog: Vec<i32>,
    pub current_bird_id: Option<i32>,
    pub revision: i32,
    pub rotated_at: Option<DateTime<Utc>>,
}

impl TryFrom<BirdOfTheDayRow> for RotationRecord {
    type Error = String;

    fn try_from(row: BirdOfTheDayRow) -> Result<Self, Self::Error> {
        let backlog = row
            .backlog
            .into_iter()
            .map(BirdId::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| format!("backlog: {err}"))?;
        let current = row
            .current_bird_id
            .map(BirdId::new)
            .transpose()
            .map_err(|err| format!("current bird: {err}"))?;
        Ok(Self {
            state: RotationState::new(backlog, current),
            revision: row.revision,
            rotated_at: row.rotated_at,
        })
    }
}

/// Full replacement of the rotation columns.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = bird_of_the_day)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct BirdOfTheDayUpdate {
    pub backlog: Vec<i32>,
    pub current_bird_id: Option<i32>,
    pub revision: i32,
    pub rotated_at: Option<DateTime<Utc>>,
}

impl BirdOfTheDayUpdate {
    pub fn new(state: &RotationState, rotated_at: DateTime<Utc>, revision: i32) -> Self {
        Self {
            backlog: state.backlog.iter().map(|id| id.get()).collect(),
            current_bird_id: state.current.map(BirdId::get),
            revision,
            rotated_at: Some(rotated_at),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregates (raw SQL)
// ---------------------------------------------------------------------------

#[derive(Debug, QueryableByName)]
pub(crate) struct DateGroupRow {
    #[diesel(sql_type = Date)]
    pub group_key: NaiveDate,
    #[diesel(sql_type = Text)]
    pub label: String,
    #[diesel(sql_type = BigInt)]
    pub group_count: i64,
}

#[derive(Debug, QueryableByName)]
pub(crate) struct BirdGroupRow {
    #[diesel(sql_type = Int4)]
    pub group_key: i32,
    #[diesel(sql_type = Text)]
    pub label: String,
    #[diesel(sql_type = BigInt)]
    pub group_count: i64,
}

#[derive(Debug, QueryableByName)]
pub(crate) struct LocationGroupRow {
    #[diesel(sql_type = SqlUuid)]
    pub group_key: Uuid,
    #[diesel(sql_type = Text)]
    pub label: String,
    #[diesel(sql_type = BigInt)]
    pub group_count: i64,
}

/// `COUNT(...) AS total` result.
#[derive(Debug, QueryableByName)]
pub(crate) struct TotalRow {
    #[diesel(sql_type = BigInt)]
    pub total: i64,
}

impl TotalRow {
    pub fn into_count(self) -> u64 {
        count(self.total)
    }
}

fn count(raw: i64) -> u64 {
    u64::try_from(raw).unwrap_or_default()
}

impl From<DateGroupRow> for SightingGroup {
    fn from(row: DateGroupRow) -> Self {
        Self::new(GroupKey::Date(row.group_key), row.label, count(row.group_count))
    }
}

impl TryFrom<BirdGroupRow> for SightingGroup {
    type Error = String;

    fn try_from(row: BirdGroupRow) -> Result<Self, Self::Error> {
        let id = BirdId::new(row.group_key).map_err(|err| err.to_string())?;
        Ok(Self::new(GroupKey::Bird(id), row.label, count(row.group_count)))
    }
}

impl From<LocationGroupRow> for SightingGroup {
    fn from(row: LocationGroupRow) -> Self {
        Self::new(
            GroupKey::Location(LocationId::from_uuid(row.group_key)),
            row.label,
            count(row.group_count),
        )
    }
}

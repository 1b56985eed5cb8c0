//! In-process record store implementing every driven port.
//!
//! Backs integration tests and local runs without PostgreSQL. All tables sit
//! behind one mutex, so each port call observes and writes a consistent
//! snapshot, matching the single-statement and single-transaction guarantees
//! of the Diesel adapters. Ordering goes through the same comparators the
//! SQL plans encode. Like the `users` foreign key, location writes are only
//! accepted for registered owners.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pagination::PageWindow;

use crate::domain::ports::{
    BirdOfTheDayRepository, BirdOfTheDayRepositoryError, BirdRepository, BirdRepositoryError,
    LocationRepository, LocationRepositoryError, Relocation, SightingAggregateRepository,
    SightingAggregateRepositoryError,
};
use crate::domain::search::compare_ranked;
use crate::domain::{
    Bird, BirdId, GroupBy, GroupKey, Location, LocationDraft, LocationId, LocationListing,
    RotationRecord, RotationState, SearchTerm, Sighting, SightingGroup, SightingListing, UserId,
    sort_groups,
};

#[derive(Debug, Default)]
struct Tables {
    users: HashSet<UserId>,
    birds: BTreeMap<BirdId, Bird>,
    locations: HashMap<LocationId, Location>,
    sightings: Vec<Sighting>,
    bird_of_the_day: Option<RotationRecord>,
}

impl Tables {
    fn user_sightings<'a>(&'a self, user_id: &'a UserId) -> impl Iterator<Item = &'a Sighting> {
        self.sightings
            .iter()
            .filter(move |sighting| &sighting.user_id == user_id)
    }

    fn user_location(&self, user_id: &UserId, location_id: LocationId) -> Option<&Location> {
        self.locations
            .get(&location_id)
            .filter(|location| &location.user_id == user_id)
    }

    fn location_named(&self, user_id: &UserId, draft: &LocationDraft) -> Option<&Location> {
        self.locations
            .values()
            .find(|location| &location.user_id == user_id && location.name == draft.name)
    }

    fn upsert_location(
        &mut self,
        user_id: &UserId,
        draft: &LocationDraft,
    ) -> Result<Location, LocationRepositoryError> {
        if !self.users.contains(user_id) {
            return Err(LocationRepositoryError::unknown_user(user_id.to_string()));
        }
        if let Some(existing) = self.location_named(user_id, draft) {
            return Ok(existing.clone());
        }
        let location = Location {
            id: LocationId::random(),
            user_id: user_id.clone(),
            name: draft.name.clone(),
            coordinates: draft.coordinates,
        };
        self.locations.insert(location.id, location.clone());
        Ok(location)
    }

    fn group_label(&self, key: GroupKey) -> String {
        match key {
            GroupKey::Date(date) => date.format("%Y-%m-%d").to_string(),
            GroupKey::Bird(id) => self
                .birds
                .get(&id)
                .map_or_else(|| id.to_string(), |bird| bird.common_name.clone()),
            GroupKey::Location(id) => self
                .locations
                .get(&id)
                .map_or_else(|| id.to_string(), |location| location.name.as_str().to_owned()),
        }
    }

    fn sighting_groups(&self, user_id: &UserId, group_by: GroupBy) -> Vec<SightingGroup> {
        let mut counts: BTreeMap<GroupKey, u64> = BTreeMap::new();
        for sighting in self.user_sightings(user_id) {
            let key = match group_by {
                GroupBy::Date => GroupKey::Date(sighting.sighted_on),
                GroupBy::Bird => GroupKey::Bird(sighting.bird_id),
                GroupBy::Location => match sighting.location_id {
                    Some(id) => GroupKey::Location(id),
                    None => continue,
                },
            };
            *counts.entry(key).or_default() += 1;
        }
        counts
            .into_iter()
            .map(|(key, count)| SightingGroup::new(key, self.group_label(key), count))
            .collect()
    }

    fn location_groups(&self, user_id: &UserId) -> Vec<SightingGroup> {
        self.locations
            .values()
            .filter(|location| &location.user_id == user_id)
            .map(|location| {
                let count = self
                    .user_sightings(user_id)
                    .filter(|sighting| sighting.location_id == Some(location.id))
                    .count();
                SightingGroup::new(
                    GroupKey::Location(location.id),
                    location.name.as_str(),
                    to_count(count),
                )
            })
            .collect()
    }
}

fn to_count(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

/// Thread-safe in-memory store.
///
/// # Examples
/// ```
/// use birdwatch::outbound::memory::InMemoryStore;
///
/// let store = InMemoryStore::default();
/// assert!(store.sightings().is_empty());
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // Every write completes before the guard drops, so a poisoned lock
        // still holds consistent data.
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Load bird reference records, replacing any with the same id.
    pub fn insert_birds(&self, birds: impl IntoIterator<Item = Bird>) {
        let mut tables = self.tables();
        for bird in birds {
            tables.birds.insert(bird.id, bird);
        }
    }

    /// Register an owner so location writes on their behalf are accepted.
    pub fn insert_user(&self, user_id: UserId) {
        self.tables().users.insert(user_id);
    }

    /// Store a location as-is, registering its owner.
    pub fn insert_location(&self, location: Location) {
        let mut tables = self.tables();
        tables.users.insert(location.user_id.clone());
        tables.locations.insert(location.id, location);
    }

    /// Store a sighting as-is, registering its owner.
    pub fn insert_sighting(&self, sighting: Sighting) {
        let mut tables = self.tables();
        tables.users.insert(sighting.user_id.clone());
        tables.sightings.push(sighting);
    }

    /// Seed the bird-of-the-day row.
    pub fn seed_bird_of_the_day(&self, record: RotationRecord) {
        self.tables().bird_of_the_day = Some(record);
    }

    /// Snapshot of the bird-of-the-day row.
    pub fn bird_of_the_day(&self) -> Option<RotationRecord> {
        self.tables().bird_of_the_day.clone()
    }

    /// Snapshot of every stored sighting.
    pub fn sightings(&self) -> Vec<Sighting> {
        self.tables().sightings.clone()
    }
}

#[async_trait]
impl BirdRepository for InMemoryStore {
    async fn search(
        &self,
        term: &SearchTerm,
        window: PageWindow,
    ) -> Result<Vec<Bird>, BirdRepositoryError> {
        let tables = self.tables();
        let mut matches: Vec<&Bird> = tables
            .birds
            .values()
            .filter(|bird| term.matches(bird))
            .collect();
        matches.sort_by(|left, right| compare_ranked(term, left, right));
        Ok(window.apply(matches).cloned().collect())
    }

    async fn count_matching(&self, term: &SearchTerm) -> Result<u64, BirdRepositoryError> {
        let tables = self.tables();
        let count = tables.birds.values().filter(|bird| term.matches(bird)).count();
        Ok(to_count(count))
    }

    async fn find_by_id(&self, id: BirdId) -> Result<Option<Bird>, BirdRepositoryError> {
        Ok(self.tables().birds.get(&id).cloned())
    }

    async fn bird_ids(&self) -> Result<Vec<BirdId>, BirdRepositoryError> {
        Ok(self.tables().birds.keys().copied().collect())
    }
}

#[async_trait]
impl SightingAggregateRepository for InMemoryStore {
    async fn group_sightings(
        &self,
        user_id: &UserId,
        listing: &SightingListing,
    ) -> Result<Vec<SightingGroup>, SightingAggregateRepositoryError> {
        let mut groups = self.tables().sighting_groups(user_id, listing.group_by());
        sort_groups(&mut groups, listing.order_plan());
        Ok(listing.window().apply(groups).collect())
    }

    async fn count_sighting_groups(
        &self,
        user_id: &UserId,
        group_by: GroupBy,
    ) -> Result<u64, SightingAggregateRepositoryError> {
        Ok(to_count(self.tables().sighting_groups(user_id, group_by).len()))
    }

    async fn group_locations(
        &self,
        user_id: &UserId,
        listing: &LocationListing,
    ) -> Result<Vec<SightingGroup>, SightingAggregateRepositoryError> {
        let mut groups = self.tables().location_groups(user_id);
        sort_groups(&mut groups, listing.order_plan());
        Ok(listing.window().apply(groups).collect())
    }

    async fn count_locations(
        &self,
        user_id: &UserId,
    ) -> Result<u64, SightingAggregateRepositoryError> {
        let tables = self.tables();
        let count = tables
            .locations
            .values()
            .filter(|location| &location.user_id == user_id)
            .count();
        Ok(to_count(count))
    }
}

#[async_trait]
impl LocationRepository for InMemoryStore {
    async fn upsert(
        &self,
        user_id: &UserId,
        draft: &LocationDraft,
    ) -> Result<Location, LocationRepositoryError> {
        self.tables().upsert_location(user_id, draft)
    }

    async fn relocate(
        &self,
        user_id: &UserId,
        from: LocationId,
        draft: &LocationDraft,
    ) -> Result<Relocation, LocationRepositoryError> {
        let mut tables = self.tables();
        if tables.user_location(user_id, from).is_none() {
            return Err(LocationRepositoryError::not_found(from.to_string()));
        }
        let location = tables.upsert_location(user_id, draft)?;
        let mut repointed = 0;
        if location.id != from {
            for sighting in tables
                .sightings
                .iter_mut()
                .filter(|sighting| &sighting.user_id == user_id)
                .filter(|sighting| sighting.location_id == Some(from))
            {
                sighting.location_id = Some(location.id);
                repointed += 1;
            }
        }
        Ok(Relocation {
            location,
            repointed,
        })
    }

    async fn unplace_sightings(
        &self,
        user_id: &UserId,
        location_id: LocationId,
    ) -> Result<u64, LocationRepositoryError> {
        let mut tables = self.tables();
        let mut affected = 0;
        for sighting in tables
            .sightings
            .iter_mut()
            .filter(|sighting| &sighting.user_id == user_id)
            .filter(|sighting| sighting.location_id == Some(location_id))
        {
            sighting.location_id = None;
            affected += 1;
        }
        Ok(affected)
    }

    async fn find_by_id(
        &self,
        user_id: &UserId,
        location_id: LocationId,
    ) -> Result<Option<Location>, LocationRepositoryError> {
        Ok(self.tables().user_location(user_id, location_id).cloned())
    }
}

#[async_trait]
impl BirdOfTheDayRepository for InMemoryStore {
    async fn load(&self) -> Result<RotationRecord, BirdOfTheDayRepositoryError> {
        self.bird_of_the_day()
            .ok_or_else(BirdOfTheDayRepositoryError::missing)
    }

    async fn save(
        &self,
        state: &RotationState,
        rotated_at: DateTime<Utc>,
        expected_revision: i32,
    ) -> Result<RotationRecord, BirdOfTheDayRepositoryError> {
        let mut tables = self.tables();
        let row = tables
            .bird_of_the_day
            .as_mut()
            .ok_or_else(BirdOfTheDayRepositoryError::missing)?;
        if row.revision != expected_revision {
            return Err(BirdOfTheDayRepositoryError::revision_mismatch(
                expected_revision,
            ));
        }
        *row = RotationRecord {
            state: state.clone(),
            revision: expected_revision.saturating_add(1),
            rotated_at: Some(rotated_at),
        };
        Ok(row.clone())
    }
}

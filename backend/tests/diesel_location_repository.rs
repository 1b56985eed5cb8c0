//! `DieselLocationRepository` against embedded PostgreSQL.
//!
//! Covers the `ON CONFLICT DO NOTHING` upsert and re-read, the transactional
//! relocate (rename and merge), unplacing, cross-user isolation and the
//! `users` foreign key, through [`LocationService`] where the behaviour is
//! part of the driving port.

use std::sync::Arc;

use birdwatch::domain::ports::{
    DeleteLocationReferenceRequest, LocationCommand, LocationRepository, LocationRepositoryError,
    UpdateLocationRequest, UpsertLocationRequest,
};
use birdwatch::domain::{ErrorCode, Location, LocationDraft, LocationId, LocationService, UserId};
use birdwatch::outbound::persistence::{DbPool, DieselLocationRepository, PoolConfig};
use birdwatch::test_support::immediate_retrier;
use color_eyre::eyre::{Result, eyre};
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{
    Seeder, catalogue, date, fresh_database, handle_cluster_setup_failure, sighting,
};

struct TestContext {
    runtime: Runtime,
    repository: Arc<DieselLocationRepository>,
    service: LocationService<DieselLocationRepository>,
    seeder: Seeder,
    user: UserId,
    _database: TemporaryDatabase,
}

fn setup_context() -> Result<TestContext> {
    let runtime = Runtime::new().map_err(|err| eyre!("create runtime: {err}"))?;
    let database = fresh_database()?;
    let mut seeder = Seeder::connect(database.url())?;
    seeder.birds(&catalogue());
    let user = seeder.user();
    let config = PoolConfig::new(database.url())
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| eyre!("create pool: {err}"))?;
    let repository = Arc::new(DieselLocationRepository::new(pool));

    Ok(TestContext {
        runtime,
        service: LocationService::new(Arc::clone(&repository), immediate_retrier(3)),
        repository,
        seeder,
        user,
        _database: database,
    })
}

#[fixture]
fn context() -> Option<TestContext> {
    match setup_context() {
        Ok(ctx) => Some(ctx),
        Err(reason) => handle_cluster_setup_failure(reason),
    }
}

impl TestContext {
    fn upsert(&self, user: &UserId, name: &str) -> Location {
        self.runtime
            .block_on(self.service.upsert_location(UpsertLocationRequest {
                user_id: user.clone(),
                name: name.to_owned(),
                latitude: 51.5,
                longitude: -0.12,
                deadline: None,
            }))
            .expect("upsert succeeds")
    }

    fn rename(&self, user: &UserId, from: LocationId, name: &str) -> Result<Location, ErrorCode> {
        self.runtime
            .block_on(self.service.update_location(UpdateLocationRequest {
                user_id: user.clone(),
                location_id: from,
                name: name.to_owned(),
                latitude: 51.5,
                longitude: -0.12,
                deadline: None,
            }))
            .map_err(|err| err.code())
    }

    fn unplace(&self, user: &UserId, location_id: LocationId) -> u64 {
        self.runtime
            .block_on(
                self.service
                    .delete_location_reference(DeleteLocationReferenceRequest {
                        user_id: user.clone(),
                        location_id,
                        deadline: None,
                    }),
            )
            .expect("delete succeeds")
            .affected_count
    }

    fn sight_at(&mut self, user: &UserId, place: Option<LocationId>, day: u32) {
        self.seeder.sighting(&sighting(user, 6, place, date(day)));
    }

    fn sightings_at(&mut self, user: &UserId, place: LocationId) -> usize {
        self.seeder
            .sighting_locations(user)
            .into_iter()
            .filter(|id| *id == Some(*place.as_uuid()))
            .count()
    }

    fn find(&self, user: &UserId, place: LocationId) -> Option<Location> {
        self.runtime
            .block_on(self.repository.find_by_id(user, place))
            .expect("lookup succeeds")
    }
}

#[rstest]
fn upsert_returns_the_existing_row_unchanged(context: Option<TestContext>) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: upsert_returns_the_existing_row_unchanged skipped");
        return;
    };
    let first = context.upsert(&context.user, "Park");
    let moved = LocationDraft::new("Park", 10.0, 10.0).expect("valid draft");

    let second = context
        .runtime
        .block_on(context.repository.upsert(&context.user, &moved))
        .expect("upsert succeeds");

    assert_eq!(second, first);
    assert_eq!(second.coordinates.latitude(), 51.5);
}

#[rstest]
fn concurrent_upserts_of_one_name_resolve_to_one_row(context: Option<TestContext>) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: concurrent_upserts_of_one_name_resolve_to_one_row skipped");
        return;
    };
    let draft = LocationDraft::new("Marsh", 51.5, -0.12).expect("valid draft");
    let repository = Arc::clone(&context.repository);

    let (left, right) = context.runtime.block_on(async {
        tokio::join!(
            repository.upsert(&context.user, &draft),
            repository.upsert(&context.user, &draft)
        )
    });

    assert_eq!(left.expect("left upsert").id, right.expect("right upsert").id);
}

#[rstest]
fn names_are_keyed_per_user(context: Option<TestContext>) {
    let Some(mut context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: names_are_keyed_per_user skipped");
        return;
    };
    let other = context.seeder.user();

    let mine = context.upsert(&context.user, "Park");
    let theirs = context.upsert(&other, "Park");

    assert_ne!(mine.id, theirs.id);
    assert_eq!(theirs.user_id, other);
}

#[rstest]
fn renaming_onto_an_existing_name_merges_sightings(context: Option<TestContext>) {
    let Some(mut context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: renaming_onto_an_existing_name_merges_sightings skipped");
        return;
    };
    let user = context.user.clone();
    let park = context.upsert(&user, "Park");
    let garden = context.upsert(&user, "Garden");
    context.sight_at(&user, Some(park.id), 1);
    context.sight_at(&user, Some(garden.id), 2);
    context.sight_at(&user, Some(garden.id), 3);

    let merged = context.rename(&user, garden.id, "Park").expect("merge");

    assert_eq!(merged.id, park.id);
    assert_eq!(context.sightings_at(&user, park.id), 3);
    assert_eq!(context.sightings_at(&user, garden.id), 0);
    assert!(context.find(&user, garden.id).is_some(), "source row is kept");
}

#[rstest]
fn renaming_to_a_fresh_name_moves_only_the_owners_sightings(context: Option<TestContext>) {
    let Some(mut context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: renaming_to_a_fresh_name_moves_only_the_owners_sightings");
        return;
    };
    let user = context.user.clone();
    let stranger = context.seeder.user();
    let garden = context.upsert(&user, "Garden");
    context.sight_at(&user, Some(garden.id), 1);
    context.sight_at(&stranger, Some(garden.id), 2);

    let renamed = context.rename(&user, garden.id, "Allotment").expect("rename");

    assert_eq!(renamed.name.as_str(), "Allotment");
    assert_eq!(context.sightings_at(&user, renamed.id), 1);
    assert_eq!(context.sightings_at(&stranger, garden.id), 1);
}

#[rstest]
fn cross_user_writes_change_nothing(context: Option<TestContext>) {
    let Some(mut context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: cross_user_writes_change_nothing skipped");
        return;
    };
    let user = context.user.clone();
    let stranger = context.seeder.user();
    let theirs = context.upsert(&stranger, "Garden");
    context.sight_at(&stranger, Some(theirs.id), 1);

    assert_eq!(context.rename(&user, theirs.id, "Mine now"), Err(ErrorCode::NotFound));
    assert_eq!(context.unplace(&user, theirs.id), 0);

    assert_eq!(context.sightings_at(&stranger, theirs.id), 1);
    assert!(context.find(&user, theirs.id).is_none());
    let untouched = context.find(&stranger, theirs.id).expect("row survives");
    assert_eq!(untouched.name.as_str(), "Garden");
}

#[rstest]
fn deleting_a_reference_unplaces_sightings_but_keeps_the_row(context: Option<TestContext>) {
    let Some(mut context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: deleting_a_reference_unplaces_sightings skipped");
        return;
    };
    let user = context.user.clone();
    let park = context.upsert(&user, "Park");
    context.sight_at(&user, Some(park.id), 1);
    context.sight_at(&user, Some(park.id), 2);
    context.sight_at(&user, None, 3);

    assert_eq!(context.unplace(&user, park.id), 2);
    assert_eq!(context.unplace(&user, park.id), 0);

    let locations = context.seeder.sighting_locations(&user);
    assert_eq!(locations.len(), 3);
    assert!(locations.iter().all(Option::is_none));
    assert!(context.find(&user, park.id).is_some());
}

#[rstest]
fn writes_for_an_unknown_user_are_not_found(context: Option<TestContext>) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: writes_for_an_unknown_user_are_not_found skipped");
        return;
    };
    let unknown = UserId::random();
    let draft = LocationDraft::new("Park", 51.5, -0.12).expect("valid draft");

    let adapter_error = context
        .runtime
        .block_on(context.repository.upsert(&unknown, &draft))
        .expect_err("no user row");
    let service_error = context
        .runtime
        .block_on(context.service.upsert_location(UpsertLocationRequest {
            user_id: unknown.clone(),
            name: "Park".to_owned(),
            latitude: 51.5,
            longitude: -0.12,
            deadline: None,
        }))
        .expect_err("no user row");

    assert_eq!(
        adapter_error,
        LocationRepositoryError::unknown_user(unknown.to_string())
    );
    assert_eq!(service_error.code(), ErrorCode::NotFound);
}

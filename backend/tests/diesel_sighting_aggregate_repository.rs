//! `DieselSightingAggregateRepository` against embedded PostgreSQL.
//!
//! The same data set is written to PostgreSQL and to the in-memory store,
//! then every `(groupBy, sortBy)` pair is walked page by page through
//! [`SightingsService`] on both. Pages must match exactly, so the rendered
//! `ORDER BY` and `COUNT(DISTINCT ...)` totals are checked against the
//! in-process comparators.

use std::collections::HashSet;
use std::sync::Arc;

use birdwatch::domain::ports::{ListLocationsRequest, ListSightingsRequest, SightingsQuery};
use birdwatch::domain::{GroupKey, LocationId, SightingGroup, SightingsService, UserId};
use birdwatch::outbound::memory::InMemoryStore;
use birdwatch::outbound::persistence::{DbPool, DieselSightingAggregateRepository, PoolConfig};
use birdwatch::test_support::immediate_retrier;
use color_eyre::eyre::{Result, eyre};
use pagination::Page;
use pg_embedded_setup_unpriv::TemporaryDatabase;
use rstest::{fixture, rstest};
use tokio::runtime::Runtime;

mod support;

use support::{
    Seeder, date, fresh_database, handle_cluster_setup_failure, location, numbered_birds,
    sighting, store_with,
};

const SIGHTINGS: usize = 30;
const LOCATIONS: usize = 12;

struct TestContext {
    runtime: Runtime,
    sql: SightingsService<DieselSightingAggregateRepository>,
    memory: SightingsService<InMemoryStore>,
    user: UserId,
    stranger: UserId,
    _database: TemporaryDatabase,
}

/// Both stores hold one user with thirty sightings over thirteen birds,
/// twelve dates and twelve locations (plus an unvisited one), with every
/// seventh sighting unplaced. A second user owns two sightings of bird 14.
fn setup_context() -> Result<TestContext> {
    let runtime = Runtime::new().map_err(|err| eyre!("create runtime: {err}"))?;
    let database = fresh_database()?;
    let mut seeder = Seeder::connect(database.url())?;
    let birds = numbered_birds(14);
    let store = store_with(birds.clone());
    seeder.birds(&birds);

    let user = seeder.user();
    let stranger = seeder.user();

    let mut places: Vec<LocationId> = Vec::new();
    let mut names: Vec<String> = (0..LOCATIONS).map(|n| format!("Site {n:02}")).collect();
    names.push("unvisited marsh".to_owned());
    for name in &names {
        let place = location(&user, name);
        places.push(place.id);
        seeder.location(&place);
        store.insert_location(place);
    }

    for i in 0..SIGHTINGS {
        let bird = i32::try_from(i % 13).expect("small index") + 1;
        let day = u32::try_from(i % 12).expect("small index") + 1;
        let place = (i % 7 != 0).then(|| places[i % LOCATIONS]);
        let row = sighting(&user, bird, place, date(day));
        seeder.sighting(&row);
        store.insert_sighting(row);
    }

    let foreign = location(&stranger, "Site 00");
    seeder.location(&foreign);
    for row in [
        sighting(&stranger, 14, Some(foreign.id), date(1)),
        sighting(&stranger, 14, None, date(20)),
    ] {
        seeder.sighting(&row);
        store.insert_sighting(row);
    }
    store.insert_location(foreign);

    let config = PoolConfig::new(database.url())
        .with_max_size(2)
        .with_min_idle(Some(1));
    let pool = runtime
        .block_on(DbPool::new(config))
        .map_err(|err| eyre!("create pool: {err}"))?;

    Ok(TestContext {
        runtime,
        sql: SightingsService::new(
            Arc::new(DieselSightingAggregateRepository::new(pool)),
            immediate_retrier(1),
        ),
        memory: SightingsService::new(Arc::clone(&store), immediate_retrier(1)),
        user,
        stranger,
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
    fn sightings_page<Q: SightingsQuery>(
        &self,
        service: &Q,
        user: &UserId,
        group_by: &str,
        sort_by: &str,
        page: i64,
    ) -> Page<SightingGroup> {
        let mut request = ListSightingsRequest::for_user(user.clone());
        request.group_by = Some(group_by.to_owned());
        request.sort_by = Some(sort_by.to_owned());
        request.page = Some(page);
        self.runtime
            .block_on(service.list_sightings(request))
            .expect("listing succeeds")
    }

    fn locations_page<Q: SightingsQuery>(
        &self,
        service: &Q,
        sort_by: &str,
        page: i64,
    ) -> Page<SightingGroup> {
        let mut request = ListLocationsRequest::for_user(self.user.clone());
        request.sort_by = Some(sort_by.to_owned());
        request.page = Some(page);
        self.runtime
            .block_on(service.list_locations(request))
            .expect("listing succeeds")
    }
}

#[rstest]
#[case("date", "dateAsc", 12)]
#[case("date", "dateDesc", 12)]
#[case("date", "count", 12)]
#[case("bird", "alphaAsc", 13)]
#[case("bird", "alphaDesc", 13)]
#[case("bird", "count", 13)]
#[case("location", "alphaAsc", 12)]
#[case("location", "alphaDesc", 12)]
#[case("location", "count", 12)]
fn pages_match_the_in_process_listing_and_cover_every_group_once(
    context: Option<TestContext>,
    #[case] group_by: &str,
    #[case] sort_by: &str,
    #[case] expected_groups: u64,
) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: pages_match_the_in_process_listing skipped");
        return;
    };

    let mut seen = HashSet::new();
    for page in 1..=2 {
        let actual = context.sightings_page(&context.sql, &context.user, group_by, sort_by, page);
        let expected =
            context.sightings_page(&context.memory, &context.user, group_by, sort_by, page);

        assert_eq!(actual, expected, "page {page} of {group_by}/{sort_by}");
        assert_eq!(actual.total_count(), expected_groups);
        for group in actual.items() {
            assert!(seen.insert(group.id), "{:?} listed twice", group.id);
        }
    }
    assert_eq!(u64::try_from(seen.len()).expect("small"), expected_groups);
}

#[rstest]
fn other_users_rows_never_leak_into_a_listing(context: Option<TestContext>) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: other_users_rows_never_leak_into_a_listing skipped");
        return;
    };

    let mine = context.sightings_page(&context.sql, &context.user, "bird", "alphaAsc", 2);
    assert!(mine.items().iter().all(|group| group.text != "Bird 014"));

    let theirs = context.sightings_page(&context.sql, &context.stranger, "bird", "count", 1);
    assert_eq!(theirs.total_count(), 1);
    assert_eq!(theirs.items()[0].count, 2);

    let by_place = context.sightings_page(&context.sql, &context.stranger, "location", "count", 1);
    assert_eq!(by_place.total_count(), 1);
    assert_eq!(by_place.items()[0].count, 1);
}

#[rstest]
#[case("alphaAsc")]
#[case("alphaDesc")]
#[case("count")]
fn location_listing_matches_and_keeps_unvisited_places(
    context: Option<TestContext>,
    #[case] sort_by: &str,
) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: location_listing_matches_and_keeps_unvisited_places skipped");
        return;
    };

    let mut groups = Vec::new();
    for page in 1..=2 {
        let actual = context.locations_page(&context.sql, sort_by, page);
        let expected = context.locations_page(&context.memory, sort_by, page);
        assert_eq!(actual, expected, "page {page} of {sort_by}");
        assert_eq!(actual.total_count(), 13);
        groups.extend(actual.items().iter().cloned());
    }

    let unvisited = groups
        .iter()
        .find(|group| group.text == "unvisited marsh")
        .expect("unvisited location is listed");
    assert_eq!(unvisited.count, 0);
    assert!(matches!(unvisited.id, GroupKey::Location(_)));
}

#[rstest]
fn labels_outside_ascii_sort_the_same_in_sql(context: Option<TestContext>) {
    let Some(context) = context else {
        eprintln!("SKIP-TEST-CLUSTER: labels_outside_ascii_sort_the_same_in_sql skipped");
        return;
    };
    let database = fresh_database().expect("second database");
    let mut seeder = Seeder::connect(database.url()).expect("seeder connects");
    let store = Arc::new(InMemoryStore::new());
    let user = seeder.user();
    for name in ["\u{c4}z", "\u{e4}a", "apple", "Zebra", "\u{c9}cluse", "eagle"] {
        let place = location(&user, name);
        seeder.location(&place);
        store.insert_location(place);
    }
    let pool = context
        .runtime
        .block_on(DbPool::new(PoolConfig::new(database.url()).with_max_size(1)))
        .expect("pool builds");
    let sql = SightingsService::new(
        Arc::new(DieselSightingAggregateRepository::new(pool)),
        immediate_retrier(1),
    );
    let memory = SightingsService::new(store, immediate_retrier(1));

    for sort_by in ["alphaAsc", "alphaDesc"] {
        let listing = |service: &dyn SightingsQuery| {
            let mut request = ListLocationsRequest::for_user(user.clone());
            request.sort_by = Some(sort_by.to_owned());
            context
                .runtime
                .block_on(service.list_locations(request))
                .expect("listing succeeds")
        };
        assert_eq!(listing(&sql), listing(&memory), "{sort_by}");
    }
}

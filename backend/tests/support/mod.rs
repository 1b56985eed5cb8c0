//! Shared fixtures for backend integration tests.
//!
//! Integration tests compile as separate crates under `backend/tests/`, so
//! catalogue builders and store seeding live here instead of being copied
//! into each file. Not every test crate uses every helper. The Diesel
//! suites add an embedded PostgreSQL cluster on top.
#![allow(dead_code)]

pub mod atexit_cleanup;
pub mod cluster_skip;
pub mod embedded_postgres;
pub mod pg_seed;

use std::sync::Arc;

use birdwatch::domain::{
    Bird, BirdId, Coordinates, Location, LocationId, LocationName, Rarity, Sighting, SightingId,
    UserId,
};
use birdwatch::outbound::memory::InMemoryStore;
use chrono::NaiveDate;

pub use cluster_skip::handle_cluster_setup_failure;
pub use embedded_postgres::{fresh_database, provision_template_database};
pub use pg_seed::Seeder;

/// Render a `postgres` error with its SQLSTATE and server message, which
/// the plain `Display` output collapses to `db error`.
pub fn format_postgres_error(error: &postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };
    let mut summary = format!("postgres error {:?}: {}", db_error.code(), db_error.message());
    for (label, part) in [("detail", db_error.detail()), ("hint", db_error.hint())] {
        if let Some(text) = part {
            summary.push_str(&format!("; {label}: {text}"));
        }
    }
    summary
}

pub fn bird_id(raw: i32) -> BirdId {
    BirdId::new(raw).expect("valid bird id")
}

pub fn bird(id: i32, common_name: &str, scientific_name: &str, family: &str) -> Bird {
    Bird {
        id: bird_id(id),
        common_name: common_name.to_owned(),
        scientific_name: scientific_name.to_owned(),
        family: family.to_owned(),
        rarity: Rarity::Common,
        description: format!("{common_name} description"),
        image: None,
    }
}

/// A small catalogue with several "eagle" matches at different ranks.
pub fn catalogue() -> Vec<Bird> {
    vec![
        bird(1, "Bald Eagle", "Haliaeetus leucocephalus", "Accipitridae"),
        bird(2, "Golden Eagle", "Aquila chrysaetos", "Accipitridae"),
        bird(3, "Eagle Owl", "Bubo bubo", "Strigidae"),
        bird(4, "Osprey", "Pandion haliaetus", "Sea eagles and kites"),
        bird(5, "Eagle", "Aquila", "Accipitridae"),
        bird(6, "Robin", "Erithacus rubecula", "Muscicapidae"),
        bird(7, "Blackbird", "Turdus merula", "Turdidae"),
        bird(8, "Wren", "Troglodytes troglodytes", "Troglodytidae"),
    ]
}

/// `count` numbered birds, `"Bird 001"` upwards.
pub fn numbered_birds(count: i32) -> Vec<Bird> {
    (1..=count)
        .map(|id| {
            bird(
                id,
                &format!("Bird {id:03}"),
                &format!("Avis {id:03}"),
                "Testidae",
            )
        })
        .collect()
}

pub fn store_with(birds: Vec<Bird>) -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    store.insert_birds(birds);
    store
}

pub fn location(user_id: &UserId, name: &str) -> Location {
    Location {
        id: LocationId::random(),
        user_id: user_id.clone(),
        name: LocationName::new(name).expect("valid location name"),
        coordinates: Coordinates::new(51.5, -0.12).expect("valid coordinates"),
    }
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, day).expect("valid date")
}

pub fn sighting(
    user_id: &UserId,
    bird: i32,
    location_id: Option<LocationId>,
    sighted_on: NaiveDate,
) -> Sighting {
    Sighting {
        id: SightingId::random(),
        user_id: user_id.clone(),
        bird_id: bird_id(bird),
        location_id,
        sighted_on,
        note: None,
    }
}

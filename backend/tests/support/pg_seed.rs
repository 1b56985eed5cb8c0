//! Direct row seeding for the Diesel suites.
//!
//! Writes go through `postgres` rather than the adapters under test, so a
//! broken adapter cannot also break its own fixtures.

use birdwatch::domain::{Bird, Location, Sighting, UserId};
use color_eyre::eyre::{Result, eyre};
use postgres::{Client, NoTls};

use super::format_postgres_error;

pub struct Seeder {
    client: Client,
}

impl Seeder {
    pub fn connect(url: &str) -> Result<Self> {
        let client =
            Client::connect(url, NoTls).map_err(|err| eyre!(format_postgres_error(&err)))?;
        Ok(Self { client })
    }

    fn execute(&mut self, sql: &str, params: &[&(dyn postgres::types::ToSql + Sync)]) {
        if let Err(err) = self.client.execute(sql, params) {
            panic!("seed statement failed: {}", format_postgres_error(&err));
        }
    }

    /// Register a fresh user row and return its id.
    pub fn user(&mut self) -> UserId {
        let user = UserId::random();
        self.execute("INSERT INTO users (id) VALUES ($1)", &[user.as_uuid()]);
        user
    }

    pub fn birds(&mut self, birds: &[Bird]) {
        for bird in birds {
            self.execute(
                "INSERT INTO birds (id, common_name, scientific_name, family, rarity, description) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
                &[
                    &bird.id.get(),
                    &bird.common_name,
                    &bird.scientific_name,
                    &bird.family,
                    &bird.rarity.as_str(),
                    &bird.description,
                ],
            );
        }
    }

    pub fn location(&mut self, location: &Location) {
        self.execute(
            "INSERT INTO locations (id, user_id, name, latitude, longitude) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                location.id.as_uuid(),
                location.user_id.as_uuid(),
                &location.name.as_str(),
                &location.coordinates.latitude(),
                &location.coordinates.longitude(),
            ],
        );
    }

    pub fn sighting(&mut self, sighting: &Sighting) {
        let location = sighting.location_id.map(|id| *id.as_uuid());
        self.execute(
            "INSERT INTO sightings (id, user_id, bird_id, location_id, sighted_on) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                sighting.id.as_uuid(),
                sighting.user_id.as_uuid(),
                &sighting.bird_id.get(),
                &location,
                &sighting.sighted_on,
            ],
        );
    }

    /// Remove the bird-of-the-day row the migration seeds.
    pub fn drop_bird_of_the_day(&mut self) {
        self.execute("DELETE FROM bird_of_the_day", &[]);
    }

    /// Location id of each of the user's sightings, in no particular order.
    pub fn sighting_locations(&mut self, user: &UserId) -> Vec<Option<uuid::Uuid>> {
        match self.client.query(
            "SELECT location_id FROM sightings WHERE user_id = $1",
            &[user.as_uuid()],
        ) {
            Ok(rows) => rows.iter().map(|row| row.get(0)).collect(),
            Err(err) => panic!("sighting read failed: {}", format_postgres_error(&err)),
        }
    }
}

//! PostgreSQL persistence adapters using Diesel.
//!
//! Repositories are thin: they translate between Diesel rows and domain
//! types and map driver failures onto each port's error enum. Row structs
//! (`models`) and table definitions (`schema`) stay private to this module.
//! Connections come from a `bb8` pool driven by `diesel-async`.
//!
//! # Example
//!
//! ```ignore
//! use birdwatch::outbound::persistence::{DbPool, DieselBirdRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/birdwatch")).await?;
//! let birds = DieselBirdRepository::new(pool);
//! ```

mod diesel_bird_of_the_day_repository;
mod diesel_bird_repository;
pub(crate) mod diesel_helpers;
mod diesel_location_repository;
mod diesel_sighting_aggregate_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_bird_of_the_day_repository::DieselBirdOfTheDayRepository;
pub use diesel_bird_repository::DieselBirdRepository;
pub use diesel_location_repository::DieselLocationRepository;
pub use diesel_sighting_aggregate_repository::DieselSightingAggregateRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};

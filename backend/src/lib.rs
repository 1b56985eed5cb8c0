//! Birdwatch core: sighting aggregation, bird search, the bird-of-the-day
//! rotation and location consistency.
//!
//! The crate follows a hexagonal layout. [`domain`] holds entities, ports
//! and services; [`outbound`] holds the Diesel and in-memory adapters;
//! [`config`] loads worker settings.

pub mod config;
pub mod domain;
pub mod outbound;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

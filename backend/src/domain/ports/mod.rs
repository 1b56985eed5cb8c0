//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Query`, `*Command`, `*Rotation`) are implemented by the
//! domain services. Driven ports (`*Repository`) are implemented by the
//! outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod bird_of_the_day_repository;
mod bird_of_the_day_rotation;
mod bird_repository;
mod bird_search_query;
mod location_command;
mod location_repository;
mod sighting_aggregate_repository;
mod sightings_query;

#[cfg(test)]
pub use bird_of_the_day_repository::MockBirdOfTheDayRepository;
pub use bird_of_the_day_repository::{BirdOfTheDayRepository, BirdOfTheDayRepositoryError};
#[cfg(test)]
pub use bird_of_the_day_rotation::MockBirdOfTheDayRotation;
pub use bird_of_the_day_rotation::BirdOfTheDayRotation;
#[cfg(test)]
pub use bird_repository::MockBirdRepository;
pub use bird_repository::{BirdRepository, BirdRepositoryError};
#[cfg(test)]
pub use bird_search_query::MockBirdSearchQuery;
pub use bird_search_query::{BirdSearchQuery, SearchBirdsRequest};
#[cfg(test)]
pub use location_command::MockLocationCommand;
pub use location_command::{
    DeleteLocationReferenceRequest, DeleteLocationReferenceResponse, LocationCommand,
    UpdateLocationRequest, UpsertLocationRequest,
};
#[cfg(test)]
pub use location_repository::MockLocationRepository;
pub use location_repository::{LocationRepository, LocationRepositoryError, Relocation};
#[cfg(test)]
pub use sighting_aggregate_repository::MockSightingAggregateRepository;
pub use sighting_aggregate_repository::{
    SightingAggregateRepository, SightingAggregateRepositoryError,
};
#[cfg(test)]
pub use sightings_query::MockSightingsQuery;
pub use sightings_query::{ListLocationsRequest, ListSightingsRequest, SightingsQuery};

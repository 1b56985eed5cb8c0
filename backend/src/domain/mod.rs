//! Domain primitives, ports and services.
//!
//! Purpose: define strongly typed entities for birds, sightings, locations
//! and the bird-of-the-day rotation, plus the services implementing the
//! driving ports. Types validate on construction; adapters never see raw
//! caller input.
//!
//! Public surface:
//! - Error (alias to `error::Error`): transport-agnostic error payload.
//! - SightingListing / LocationListing: validated listing requests.
//! - RotationState: the backlog state machine.
//! - services: `BirdSearchService`, `SightingsService`, `LocationService`,
//!   `BirdOfTheDayService` and the `RotationScheduler` task.

pub mod bird;
mod bird_of_the_day_scheduler;
mod bird_of_the_day_service;
mod bird_search_service;
pub mod error;
pub mod grouping;
pub mod listing;
pub mod location;
mod location_service;
pub mod ports;
pub mod retry;
pub mod rotation;
pub mod search;
pub mod sighting;
mod sightings_service;
pub mod user;

pub use self::bird::{Bird, BirdId, BirdValidationError, ImageAttribution, Rarity};
pub use self::bird_of_the_day_scheduler::{
    RotationScheduler, SchedulerConfig, SchedulerRuntime, TickOutcome,
};
pub use self::bird_of_the_day_service::{BirdOfTheDayService, ROTATION_SAVE_ATTEMPTS};
pub use self::bird_search_service::BirdSearchService;
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::grouping::{GroupKey, SightingGroup, compare_groups, compare_labels, sort_groups};
pub use self::listing::{
    Direction, GroupBy, ListingValidationError, LocationListing, OrderKey, OrderPlan, OrderTerm,
    SightingListing, SortBy,
};
pub use self::location::{
    Coordinates, LOCATION_NAME_MAX, Location, LocationDraft, LocationId, LocationName,
    LocationValidationError,
};
pub use self::location_service::LocationService;
pub use self::retry::{
    AttemptJitter, BackoffJitter, Retrier, RetryPolicy, RetryRuntime, Sleeper, TokioSleeper,
    TransientError, with_deadline,
};
pub use self::rotation::{BirdPopulation, RotationError, RotationRecord, RotationState};
pub use self::search::{BirdSearch, SEARCH_TERM_MAX, SearchTerm, SearchValidationError};
pub use self::sighting::{
    SIGHTING_NOTE_MAX, Sighting, SightingId, SightingNote, SightingValidationError,
};
pub use self::sightings_service::SightingsService;
pub use self::user::{UserId, UserValidationError};

/// Convenient domain result alias.
///
/// # Examples
/// ```
/// use birdwatch::domain::{DomainResult, Error};
///
/// fn lookup() -> DomainResult<u32> {
///     Err(Error::not_found("nope"))
/// }
/// assert!(lookup().is_err());
/// ```
pub type DomainResult<T> = Result<T, Error>;

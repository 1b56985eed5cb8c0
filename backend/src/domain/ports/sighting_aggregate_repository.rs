//! Port for grouped, read-only views over a user's sightings.
//!
//! Adapters execute the order plan carried by the listing verbatim and apply
//! its page window. Counts are computed by a separate query and ignore the
//! window.

use async_trait::async_trait;

use crate::domain::{
    GroupBy, LocationListing, SightingGroup, SightingListing, TransientError, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by sighting aggregate adapters.
    pub enum SightingAggregateRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "sighting aggregate connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "sighting aggregate query failed: {message}",
    }
}

impl TransientError for SightingAggregateRepositoryError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SightingAggregateRepository: Send + Sync {
    /// One page of `{id, text, count}` groups of the user's sightings.
    ///
    /// Unplaced sightings never form a location group.
    async fn group_sightings(
        &self,
        user_id: &UserId,
        listing: &SightingListing,
    ) -> Result<Vec<SightingGroup>, SightingAggregateRepositoryError>;

    /// Number of distinct groups for `group_by`.
    async fn count_sighting_groups(
        &self,
        user_id: &UserId,
        group_by: GroupBy,
    ) -> Result<u64, SightingAggregateRepositoryError>;

    /// One page of the user's locations with their sighting counts.
    ///
    /// Locations without sightings are included with a count of zero.
    async fn group_locations(
        &self,
        user_id: &UserId,
        listing: &LocationListing,
    ) -> Result<Vec<SightingGroup>, SightingAggregateRepositoryError>;

    async fn count_locations(&self, user_id: &UserId)
    -> Result<u64, SightingAggregateRepositoryError>;
}

//! Port for user location writes.
//!
//! Every method is scoped to one user: statements must filter by the owning
//! user id themselves rather than checking ownership afterwards.

use async_trait::async_trait;

use crate::domain::{Location, LocationDraft, LocationId, TransientError, UserId};

use super::define_port_error;

define_port_error! {
    /// Errors raised by location repository adapters.
    pub enum LocationRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "location repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "location repository query failed: {message}",
        /// A concurrent writer raced this one on the `(user_id, name)` key.
        Conflict { message: String } =>
            "location write conflicted: {message}",
        /// The location does not exist for this user.
        NotFound { location_id: String } =>
            "location {location_id} not found",
        /// No user row exists for the owner id, so nothing can be keyed to it.
        UnknownUser { user_id: String } =>
            "user {user_id} not found",
    }
}

impl TransientError for LocationRepositoryError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. } | Self::Conflict { .. })
    }
}

/// Outcome of a rename or merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Relocation {
    /// Row the sightings now point at.
    pub location: Location,
    /// Number of sightings re-pointed.
    pub repointed: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Return the row keyed by `(user_id, draft.name)`, creating it when
    /// absent. Existing rows are returned unchanged.
    ///
    /// Fails with [`LocationRepositoryError::UnknownUser`] when `user_id`
    /// has no user row.
    async fn upsert(
        &self,
        user_id: &UserId,
        draft: &LocationDraft,
    ) -> Result<Location, LocationRepositoryError>;

    /// Upsert `draft` and move every sighting of `user_id` at `from` to the
    /// resulting row, in one transaction.
    ///
    /// Fails with [`LocationRepositoryError::NotFound`] and writes nothing
    /// when `from` is not one of the user's locations.
    async fn relocate(
        &self,
        user_id: &UserId,
        from: LocationId,
        draft: &LocationDraft,
    ) -> Result<Relocation, LocationRepositoryError>;

    /// Null the location reference on the user's sightings at `location_id`.
    ///
    /// Returns the number of sightings changed. The location row is kept.
    async fn unplace_sightings(
        &self,
        user_id: &UserId,
        location_id: LocationId,
    ) -> Result<u64, LocationRepositoryError>;

    async fn find_by_id(
        &self,
        user_id: &UserId,
        location_id: LocationId,
    ) -> Result<Option<Location>, LocationRepositoryError>;
}

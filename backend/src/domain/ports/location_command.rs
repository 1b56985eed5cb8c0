//! Driving port for location writes that keep sighting references coherent.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::{Error, Location, LocationId, UserId};

/// Lookup-or-create input keyed by `(user_id, name)`.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertLocationRequest {
    pub user_id: UserId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub deadline: Option<Duration>,
}

/// Rename or merge input for an existing location.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateLocationRequest {
    pub user_id: UserId,
    pub location_id: LocationId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Bound on the transaction; expiry rolls back both steps.
    pub deadline: Option<Duration>,
}

/// Removes every reference the user's sightings hold to one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteLocationReferenceRequest {
    pub user_id: UserId,
    pub location_id: LocationId,
    pub deadline: Option<Duration>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteLocationReferenceResponse {
    pub affected_count: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LocationCommand: Send + Sync {
    /// Return the user's location with this name, creating it if needed.
    async fn upsert_location(&self, request: UpsertLocationRequest) -> Result<Location, Error>;

    /// Upsert under the new name, then move this location's sightings to it.
    ///
    /// Renaming onto a name the user already has merges both sighting sets.
    async fn update_location(&self, request: UpdateLocationRequest) -> Result<Location, Error>;

    /// Unplace the user's sightings at `location_id`; the row itself stays.
    async fn delete_location_reference(
        &self,
        request: DeleteLocationReferenceRequest,
    ) -> Result<DeleteLocationReferenceResponse, Error>;
}

//! Location consistency service.
//!
//! Keeps sighting→location references coherent across upsert, rename/merge
//! and reference removal. Unique-key races on `(user_id, name)` are retried
//! a bounded number of times and only surface as `conflict` once the budget
//! is spent. Every command honours the caller's deadline.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::domain::ports::{
    DeleteLocationReferenceRequest, DeleteLocationReferenceResponse, LocationCommand,
    LocationRepository, LocationRepositoryError, UpdateLocationRequest, UpsertLocationRequest,
};
use crate::domain::{
    Error, Location, LocationDraft, LocationId, LocationValidationError, Retrier, UserId,
    with_deadline,
};

fn map_repository_error(error: LocationRepositoryError) -> Error {
    match error {
        LocationRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("location repository unavailable: {message}"))
        }
        LocationRepositoryError::Query { message } => {
            Error::internal(format!("location repository error: {message}"))
        }
        LocationRepositoryError::Conflict { message } => {
            Error::conflict(format!("location write kept conflicting: {message}"))
        }
        LocationRepositoryError::NotFound { location_id } => {
            Error::not_found(format!("location {location_id} not found"))
        }
        LocationRepositoryError::UnknownUser { user_id } => {
            Error::not_found(format!("user {user_id} not found"))
        }
    }
}

fn map_validation_error(error: LocationValidationError) -> Error {
    let field = match error {
        LocationValidationError::EmptyName | LocationValidationError::NameTooLong { .. } => "name",
        LocationValidationError::LatitudeOutOfRange(_) => "latitude",
        LocationValidationError::LongitudeOutOfRange(_) => "longitude",
    };
    Error::invalid_request(error.to_string()).with_details(json!({ "field": field }))
}

/// Location write service implementing [`LocationCommand`].
#[derive(Clone)]
pub struct LocationService<R> {
    location_repo: Arc<R>,
    retrier: Retrier,
}

impl<R> LocationService<R> {
    /// `retrier` bounds both conflict and connection retries.
    pub fn new(location_repo: Arc<R>, retrier: Retrier) -> Self {
        Self {
            location_repo,
            retrier,
        }
    }
}

impl<R> LocationService<R>
where
    R: LocationRepository,
{
    async fn relocate(
        &self,
        user_id: &UserId,
        from: LocationId,
        draft: &LocationDraft,
    ) -> Result<Location, Error> {
        let repo = &self.location_repo;
        let relocation = self
            .retrier
            .run("relocate_location", || repo.relocate(user_id, from, draft))
            .await
            .map_err(map_repository_error)?;
        debug!(
            %user_id,
            from = %from,
            to = %relocation.location.id,
            repointed = relocation.repointed,
            "relocated sightings"
        );
        Ok(relocation.location)
    }
}

#[async_trait]
impl<R> LocationCommand for LocationService<R>
where
    R: LocationRepository,
{
    async fn upsert_location(&self, request: UpsertLocationRequest) -> Result<Location, Error> {
        let draft = LocationDraft::new(&request.name, request.latitude, request.longitude)
            .map_err(map_validation_error)?;
        let repo = &self.location_repo;
        let user_id = &request.user_id;
        let upsert = async {
            self.retrier
                .run("upsert_location", || repo.upsert(user_id, &draft))
                .await
                .map_err(map_repository_error)
        };
        with_deadline(request.deadline, upsert).await
    }

    async fn update_location(&self, request: UpdateLocationRequest) -> Result<Location, Error> {
        let draft = LocationDraft::new(&request.name, request.latitude, request.longitude)
            .map_err(map_validation_error)?;
        with_deadline(
            request.deadline,
            self.relocate(&request.user_id, request.location_id, &draft),
        )
        .await
    }

    async fn delete_location_reference(
        &self,
        request: DeleteLocationReferenceRequest,
    ) -> Result<DeleteLocationReferenceResponse, Error> {
        let repo = &self.location_repo;
        let DeleteLocationReferenceRequest {
            user_id,
            location_id,
            deadline,
        } = request;
        let unplace = async {
            let affected_count = self
                .retrier
                .run("unplace_sightings", || {
                    repo.unplace_sightings(&user_id, location_id)
                })
                .await
                .map_err(map_repository_error)?;
            debug!(%user_id, %location_id, affected_count, "unplaced sightings");
            Ok(DeleteLocationReferenceResponse { affected_count })
        };
        with_deadline(deadline, unplace).await
    }
}

#[cfg(test)]
#[path = "location_service_tests.rs"]
mod tests;

//! Grouped sighting and location listings.
//!
//! Requests are validated into a [`SightingListing`] or [`LocationListing`]
//! before the store is queried. Each page is paired with a total from a
//! separate count query.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::{Page, PageWindow};

use crate::domain::ports::{
    ListLocationsRequest, ListSightingsRequest, SightingAggregateRepository,
    SightingAggregateRepositoryError, SightingsQuery,
};
use crate::domain::{
    Error, LocationListing, Retrier, SightingGroup, SightingListing, UserId, with_deadline,
};

fn map_repository_error(error: SightingAggregateRepositoryError) -> Error {
    match error {
        SightingAggregateRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("sighting store unavailable: {message}"))
        }
        SightingAggregateRepositoryError::Query { message } => {
            Error::internal(format!("sighting store error: {message}"))
        }
    }
}

fn into_page(groups: Vec<SightingGroup>, total: u64, window: PageWindow) -> Page<SightingGroup> {
    Page::new(groups, total, window.page(), window.size())
}

/// Read-only aggregation over a user's sightings.
#[derive(Clone)]
pub struct SightingsService<R> {
    aggregate_repo: Arc<R>,
    retrier: Retrier,
}

impl<R> SightingsService<R> {
    pub fn new(aggregate_repo: Arc<R>, retrier: Retrier) -> Self {
        Self {
            aggregate_repo,
            retrier,
        }
    }
}

impl<R> SightingsService<R>
where
    R: SightingAggregateRepository,
{
    async fn sightings_page(
        &self,
        user_id: &UserId,
        listing: &SightingListing,
    ) -> Result<Page<SightingGroup>, Error> {
        let repo = &self.aggregate_repo;
        let total = self
            .retrier
            .run("count_sighting_groups", || {
                repo.count_sighting_groups(user_id, listing.group_by())
            })
            .await
            .map_err(map_repository_error)?;
        let groups = self
            .retrier
            .run("group_sightings", || repo.group_sightings(user_id, listing))
            .await
            .map_err(map_repository_error)?;
        Ok(into_page(groups, total, listing.window()))
    }

    async fn locations_page(
        &self,
        user_id: &UserId,
        listing: &LocationListing,
    ) -> Result<Page<SightingGroup>, Error> {
        let repo = &self.aggregate_repo;
        let total = self
            .retrier
            .run("count_locations", || repo.count_locations(user_id))
            .await
            .map_err(map_repository_error)?;
        let groups = self
            .retrier
            .run("group_locations", || repo.group_locations(user_id, listing))
            .await
            .map_err(map_repository_error)?;
        Ok(into_page(groups, total, listing.window()))
    }
}

#[async_trait]
impl<R> SightingsQuery for SightingsService<R>
where
    R: SightingAggregateRepository,
{
    async fn list_sightings(
        &self,
        request: ListSightingsRequest,
    ) -> Result<Page<SightingGroup>, Error> {
        let listing = SightingListing::compose(
            request.group_by.as_deref(),
            request.sort_by.as_deref(),
            request.page,
        )?;
        with_deadline(
            request.deadline,
            self.sightings_page(&request.user_id, &listing),
        )
        .await
    }

    async fn list_locations(
        &self,
        request: ListLocationsRequest,
    ) -> Result<Page<SightingGroup>, Error> {
        let listing = LocationListing::compose(request.sort_by.as_deref(), request.page)?;
        with_deadline(
            request.deadline,
            self.locations_page(&request.user_id, &listing),
        )
        .await
    }
}

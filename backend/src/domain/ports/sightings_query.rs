//! Driving port for grouped sighting and location listings.

use std::time::Duration;

use async_trait::async_trait;
use pagination::Page;

use crate::domain::{Error, SightingGroup, UserId};

/// Raw grouped-sightings input. Tokens are validated by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSightingsRequest {
    pub user_id: UserId,
    /// `date`, `bird` or `location`; defaults to `date`.
    pub group_by: Option<String>,
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub deadline: Option<Duration>,
}

impl ListSightingsRequest {
    /// Request the first page with default grouping and sort.
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            group_by: None,
            sort_by: None,
            page: None,
            deadline: None,
        }
    }
}

/// Raw locations-with-counts input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListLocationsRequest {
    pub user_id: UserId,
    pub sort_by: Option<String>,
    pub page: Option<i64>,
    pub deadline: Option<Duration>,
}

impl ListLocationsRequest {
    pub fn for_user(user_id: UserId) -> Self {
        Self {
            user_id,
            sort_by: None,
            page: None,
            deadline: None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SightingsQuery: Send + Sync {
    /// Group the user's sightings and return one page of groups.
    async fn list_sightings(
        &self,
        request: ListSightingsRequest,
    ) -> Result<Page<SightingGroup>, Error>;

    /// List the user's locations with sighting counts.
    async fn list_locations(
        &self,
        request: ListLocationsRequest,
    ) -> Result<Page<SightingGroup>, Error>;
}

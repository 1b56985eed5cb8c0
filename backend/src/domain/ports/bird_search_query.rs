//! Driving port for relevance-ranked bird search.

use std::time::Duration;

use async_trait::async_trait;
use pagination::Page;

use crate::domain::{Bird, Error};

/// Raw search input as received from the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchBirdsRequest {
    /// Free-text term matched against common name and family.
    pub term: String,
    /// One-based page; defaults to the first page.
    pub page: Option<i64>,
    /// Optional bound on the whole call.
    pub deadline: Option<Duration>,
}

impl SearchBirdsRequest {
    pub fn new(term: impl Into<String>, page: Option<i64>) -> Self {
        Self {
            term: term.into(),
            page,
            deadline: None,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BirdSearchQuery: Send + Sync {
    /// Search birds, returning one page plus the total match count.
    async fn search_birds(&self, request: SearchBirdsRequest) -> Result<Page<Bird>, Error>;
}

//! Bird search service.
//!
//! Implements [`BirdSearchQuery`] over a [`BirdRepository`]. The total is
//! read with its own query so it never depends on the page requested.

use std::sync::Arc;

use async_trait::async_trait;
use pagination::Page;

use crate::domain::ports::{
    BirdRepository, BirdRepositoryError, BirdSearchQuery, SearchBirdsRequest,
};
use crate::domain::{Bird, BirdSearch, Error, Retrier, with_deadline};

fn map_repository_error(error: BirdRepositoryError) -> Error {
    match error {
        BirdRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("bird repository unavailable: {message}"))
        }
        BirdRepositoryError::Query { message } => {
            Error::internal(format!("bird repository error: {message}"))
        }
    }
}

/// Relevance-ranked search over bird reference data.
#[derive(Clone)]
pub struct BirdSearchService<R> {
    bird_repo: Arc<R>,
    retrier: Retrier,
}

impl<R> BirdSearchService<R> {
    /// Create a service retrying transient failures with `retrier`.
    pub fn new(bird_repo: Arc<R>, retrier: Retrier) -> Self {
        Self { bird_repo, retrier }
    }
}

impl<R> BirdSearchService<R>
where
    R: BirdRepository,
{
    async fn run(&self, search: &BirdSearch) -> Result<Page<Bird>, Error> {
        let term = search.term();
        let window = search.window();

        let total = self
            .retrier
            .run("count_matching_birds", || self.bird_repo.count_matching(term))
            .await
            .map_err(map_repository_error)?;
        let birds = self
            .retrier
            .run("search_birds", || self.bird_repo.search(term, window))
            .await
            .map_err(map_repository_error)?;

        Ok(Page::new(birds, total, window.page(), window.size()))
    }
}

#[async_trait]
impl<R> BirdSearchQuery for BirdSearchService<R>
where
    R: BirdRepository,
{
    async fn search_birds(&self, request: SearchBirdsRequest) -> Result<Page<Bird>, Error> {
        let search = BirdSearch::compose(&request.term, request.page)?;
        with_deadline(request.deadline, self.run(&search)).await
    }
}

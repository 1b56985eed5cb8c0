//! Port for bird reference data.
//!
//! Birds are read-only from the core's point of view. Search methods take a
//! validated [`SearchTerm`] and must order matches by relevance rank
//! descending, then id ascending, so repeated calls page identically.

use async_trait::async_trait;
use pagination::PageWindow;

use crate::domain::{Bird, BirdId, SearchTerm, TransientError};

use super::define_port_error;

define_port_error! {
    /// Errors raised by bird repository adapters.
    pub enum BirdRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "bird repository connection failed: {message}",
        /// Query failed during execution.
        Query { message: String } =>
            "bird repository query failed: {message}",
    }
}

impl TransientError for BirdRepositoryError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BirdRepository: Send + Sync {
    /// One page of birds matching `term`, in rank order.
    async fn search(
        &self,
        term: &SearchTerm,
        window: PageWindow,
    ) -> Result<Vec<Bird>, BirdRepositoryError>;

    /// Number of birds matching `term`, independent of paging.
    async fn count_matching(&self, term: &SearchTerm) -> Result<u64, BirdRepositoryError>;

    async fn find_by_id(&self, id: BirdId) -> Result<Option<Bird>, BirdRepositoryError>;

    /// Every bird id in the store, in any order.
    async fn bird_ids(&self) -> Result<Vec<BirdId>, BirdRepositoryError>;
}

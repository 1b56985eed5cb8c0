//! Port for the singleton bird-of-the-day row.
//!
//! Writes are compare-and-swap on the row revision so overlapping advances
//! serialise: the loser sees
//! [`BirdOfTheDayRepositoryError::RevisionMismatch`] and starts over.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{RotationRecord, RotationState, TransientError};

use super::define_port_error;

define_port_error! {
    /// Errors raised by bird-of-the-day repository adapters.
    pub enum BirdOfTheDayRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "bird of the day connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "bird of the day query failed: {message}",
        /// The singleton row has not been seeded.
        Missing =>
            "bird of the day row is missing",
        /// Another writer saved first.
        RevisionMismatch { expected: i32 } =>
            "bird of the day revision {expected} is stale",
    }
}

impl TransientError for BirdOfTheDayRepositoryError {
    fn is_transient(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BirdOfTheDayRepository: Send + Sync {
    /// Read the singleton row.
    async fn load(&self) -> Result<RotationRecord, BirdOfTheDayRepositoryError>;

    /// Replace backlog and current in one statement if the stored revision
    /// still equals `expected_revision`. Returns the row as written, with
    /// the revision incremented.
    async fn save(
        &self,
        state: &RotationState,
        rotated_at: DateTime<Utc>,
        expected_revision: i32,
    ) -> Result<RotationRecord, BirdOfTheDayRepositoryError>;
}

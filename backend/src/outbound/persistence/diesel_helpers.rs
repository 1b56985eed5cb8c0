//! Shared error classification for the Diesel repositories.
//!
//! Each repository owns its port error type; these helpers decide which of
//! its constructors a driver failure maps onto.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use super::pool::PoolError;

/// Coarse class of a Diesel failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FailureKind {
    /// The connection dropped; the call can be retried.
    Connection,
    /// A uniqueness or serialisation race with another writer.
    Conflict,
    /// A foreign key named a row that does not exist.
    MissingReference,
    /// Anything else.
    Query,
}

/// Classify `error` and log it at `debug` with the operation name.
pub(crate) fn classify_diesel_error(error: &DieselError, operation: &str) -> FailureKind {
    match error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), %operation, "diesel operation failed");
        }
        _ => debug!(%error, %operation, "diesel operation failed"),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _)
        | DieselError::BrokenTransactionManager => FailureKind::Connection,
        DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation | DatabaseErrorKind::SerializationFailure,
            _,
        ) => FailureKind::Conflict,
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            FailureKind::MissingReference
        }
        _ => FailureKind::Query,
    }
}

/// Map a pool failure through a repository's connection constructor.
pub(crate) fn map_pool_error<E>(error: PoolError, connection: impl FnOnce(String) -> E) -> E {
    connection(error.into_message())
}

/// Map a Diesel failure through a repository's connection and query
/// constructors. Conflicts and missing references count as query errors
/// here.
pub(crate) fn map_basic_diesel_error<E>(
    error: DieselError,
    operation: &str,
    connection: impl FnOnce(String) -> E,
    query: impl FnOnce(String) -> E,
) -> E {
    match classify_diesel_error(&error, operation) {
        FailureKind::Connection => connection(error.to_string()),
        FailureKind::Conflict | FailureKind::MissingReference | FailureKind::Query => {
            query(error.to_string())
        }
    }
}

/// Convert row results, reporting the first malformed row through `query`.
pub(crate) fn collect_rows<T, E>(
    results: impl Iterator<Item = Result<T, String>>,
    query: impl FnOnce(String) -> E,
) -> Result<Vec<T>, E> {
    results.collect::<Result<Vec<_>, _>>().map_err(query)
}

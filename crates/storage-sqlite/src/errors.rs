//! Errors raised inside the SQLite layer.
//!
//! Diesel and r2d2 errors are wrapped here and converted to the
//! database-agnostic errors of `fintrack_core` before leaving this crate.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use fintrack_core::errors::{DatabaseError, Error, ValidationError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Cannot open SQLite connection: {0}")]
    ConnectionFailed(#[from] diesel::ConnectionError),

    #[error("Pool checkout failed: {0}")]
    PoolError(#[from] r2d2::Error),

    #[error("Diesel query failed: {0}")]
    QueryFailed(#[from] DieselError),

    #[error("Migrations could not be applied: {0}")]
    MigrationFailed(String),

    /// A stored value that no longer parses into its domain type.
    #[error("Corrupt value in column {column}: {message}")]
    CorruptValue { column: &'static str, message: String },

    /// A core error raised inside a write job. Kept intact so callers can
    /// still tell conflicts and not-found apart after the transaction unwinds.
    #[error(transparent)]
    Core(#[from] Error),
}

impl StorageError {
    pub fn corrupt(column: &'static str, message: impl ToString) -> Self {
        StorageError::CorruptValue {
            column,
            message: message.to_string(),
        }
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(e) => {
                Error::Database(DatabaseError::ConnectionFailed(e.to_string()))
            }
            StorageError::PoolError(e) => {
                Error::Database(DatabaseError::PoolCreationFailed(e.to_string()))
            }
            StorageError::QueryFailed(DieselError::NotFound) => {
                Error::Database(DatabaseError::NotFound("no matching row".to_string()))
            }
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::UniqueViolation,
                info,
            )) => Error::Database(DatabaseError::UniqueViolation(info.message().to_string())),
            StorageError::QueryFailed(DieselError::DatabaseError(
                DatabaseErrorKind::ForeignKeyViolation,
                info,
            )) => Error::Database(DatabaseError::ForeignKeyViolation(
                info.message().to_string(),
            )),
            StorageError::QueryFailed(e) => {
                Error::Database(DatabaseError::QueryFailed(e.to_string()))
            }
            StorageError::MigrationFailed(e) => Error::Database(DatabaseError::MigrationFailed(e)),
            StorageError::CorruptValue { column, message } => Error::Database(
                DatabaseError::Internal(format!("{}: {}", column, message)),
            ),
            StorageError::Core(e) => e,
        }
    }
}

/// Maps a unique-key violation to a duplicate validation error, anything
/// else to its storage error.
pub(crate) fn duplicate_or_storage(err: DieselError, describe: impl FnOnce() -> String) -> Error {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ValidationError::Duplicate(describe()).into()
        }
        other => StorageError::from(other).into(),
    }
}

/// Converts Diesel and pool results into core results at the repository edge.
pub trait IntoCore<T> {
    fn into_core(self) -> fintrack_core::Result<T>;
}

impl<T> IntoCore<T> for std::result::Result<T, DieselError> {
    fn into_core(self) -> fintrack_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

impl<T> IntoCore<T> for std::result::Result<T, r2d2::Error> {
    fn into_core(self) -> fintrack_core::Result<T> {
        self.map_err(|e| StorageError::from(e).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_errors_pass_through_unchanged() {
        let err: Error =
            StorageError::from(Error::ConcurrencyConflict("budget b1".to_string())).into();
        assert!(err.is_concurrency_conflict());
    }

    #[test]
    fn test_not_found_maps_to_database_not_found() {
        let err: Error = StorageError::QueryFailed(DieselError::NotFound).into();
        assert!(err.is_not_found());
    }
}

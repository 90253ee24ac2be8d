//! Error types shared by every FinTrack crate.
//!
//! The storage crate converts its own failures into [`DatabaseError`];
//! everything else is raised by the services directly.

use chrono::ParseError as ChronoParseError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the finance core.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Database operation failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Input validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A versioned write observed a newer version than the one it read.
    #[error("Concurrent modification detected: {0}")]
    ConcurrencyConflict(String),

    /// An unrecoverable condition for a single recurring job.
    #[error("Recurring job failed permanently: {0}")]
    FatalJob(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// Shorthand for `Error::Validation(ValidationError::InvalidInput(..))`.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Error::Validation(ValidationError::InvalidInput(message.into()))
    }

    pub fn not_found(entity: &str, id: &str) -> Self {
        Error::NotFound(format!("{} '{}'", entity, id))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::Database(DatabaseError::NotFound(_))
        )
    }

    pub fn is_concurrency_conflict(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict(_))
    }
}

/// Store failures as plain strings, so nothing above the storage crate
/// depends on Diesel or SQLite types.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Cannot open the ledger database: {0}")]
    ConnectionFailed(String),

    #[error("Cannot build the connection pool: {0}")]
    PoolCreationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("No such row: {0}")]
    NotFound(String),

    /// A unique index rejected the row. Services map this to
    /// `ValidationError::Duplicate` where the index is a business rule.
    #[error("Unique index violated: {0}")]
    UniqueViolation(String),

    #[error("Referenced row is missing: {0}")]
    ForeignKeyViolation(String),

    /// The writer could not commit, or went away mid-transaction.
    #[error("Write transaction aborted: {0}")]
    TransactionFailed(String),

    #[error("Schema migration failed: {0}")]
    MigrationFailed(String),

    #[error("Storage error: {0}")]
    Internal(String),
}

/// Validation errors for user input and data parsing.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Required field '{0}' is missing")]
    MissingField(String),

    #[error("Failed to parse decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),

    #[error("Failed to parse date/time: {0}")]
    DateTimeParse(#[from] ChronoParseError),

    #[error("Invalid month '{0}', expected YYYY-MM")]
    InvalidMonth(String),

    #[error("Unknown recurring frequency '{0}'")]
    InvalidFrequency(String),

    #[error("Share ratios of wallet {wallet_id} sum to {total}, which exceeds 1")]
    RatioSumExceeded { wallet_id: String, total: String },

    #[error("Currency mismatch: {0} vs {1}")]
    CurrencyMismatch(String, String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Validation(ValidationError::InvalidInput(err.to_string()))
    }
}

impl From<ChronoParseError> for Error {
    fn from(err: ChronoParseError) -> Self {
        Error::Validation(ValidationError::DateTimeParse(err))
    }
}

impl From<Error> for String {
    fn from(err: Error) -> Self {
        err.to_string()
    }
}

//! Text codecs for columns that SQLite cannot store natively.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::errors::StorageError;

pub use fintrack_core::utils::time_utils::format_instant;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_decimal(value: &str, column: &'static str) -> Result<Decimal, StorageError> {
    Decimal::from_str(value).map_err(|e| StorageError::corrupt(column, e))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(value: &str, column: &'static str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| StorageError::corrupt(column, e))
}

pub fn parse_timestamp(value: &str, column: &'static str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::corrupt(column, e))
}

pub fn parse_optional_timestamp(
    value: Option<&str>,
    column: &'static str,
) -> Result<Option<DateTime<Utc>>, StorageError> {
    value.map(|v| parse_timestamp(v, column)).transpose()
}

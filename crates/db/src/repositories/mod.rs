use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;
use wardhouse_core::errors::StorageError;

pub mod memory;
pub mod source;
pub mod warehouse;

pub use memory::{InMemorySourceReader, InMemoryWarehouseSink};
pub use source::SqlSourceReader;
pub use warehouse::SqlWarehouseSink;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";
const ACCEPTED_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

impl RepositoryError {
    pub fn into_read_error(self) -> StorageError {
        match self {
            Self::Database(error) => StorageError::Unavailable(error.to_string()),
            Self::Decode(message) => StorageError::Decode(message),
        }
    }

    pub fn into_write_error(self) -> StorageError {
        match self {
            Self::Database(error) => StorageError::Write(error.to_string()),
            Self::Decode(message) => StorageError::Decode(message),
        }
    }
}

pub(crate) fn format_timestamp(value: NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

pub(crate) fn format_date(value: NaiveDate) -> String {
    value.format(DATE_FORMAT).to_string()
}

pub(crate) fn parse_timestamp(column: &str, value: &str) -> Result<NaiveDateTime, RepositoryError> {
    let trimmed = value.trim();
    ACCEPTED_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}`")))
}

pub(crate) fn parse_date(column: &str, value: &str) -> Result<NaiveDate, RepositoryError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|error| RepositoryError::Decode(format!("invalid date in `{column}`: `{value}` ({error})")))
}

pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, RepositoryError> {
    let trimmed = value.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|error| RepositoryError::Decode(format!("invalid decimal in `{column}`: `{value}` ({error})")))
}

//! Shared types and result types for the database layer

pub mod errors;

use chrono::{DateTime, SecondsFormat, Utc};

pub use errors::DatabaseError;

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Render a timestamp in the fixed-width form stored in every table.
///
/// All rows use microsecond precision and a `Z` suffix so that comparing the
/// text columns in SQL orders them chronologically.
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> DatabaseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|e| DatabaseError::InvalidData(format!("timestamp {value:?}: {e}")))
}

pub fn parse_optional_timestamp(value: Option<String>) -> DatabaseResult<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

pub mod schema;
pub mod connection;
pub mod repositories;

pub use connection::{Database, DbPool};

use chrono::{DateTime, SecondsFormat, Utc};

/// Timestamps are stored as fixed-width RFC3339 strings so that ORDER BY on
/// the text column is chronological.
pub(crate) fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

/// Parse a stored timestamp column inside a row mapper.
pub(crate) fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

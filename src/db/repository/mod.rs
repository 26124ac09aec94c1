//! Repository layer: table-scoped database operations.
//!
//! All public functions are re-exported here so callers use `db::repository::*`.

mod assignment;
mod bed;
mod consistency;
mod department;
mod patient;

use chrono::{DateTime, SecondsFormat, Utc};

use super::DatabaseError;

pub use assignment::*;
pub use bed::*;
pub use consistency::*;
pub use department::*;
pub use patient::*;

/// Stored form of every timestamp: RFC 3339, UTC, microseconds. Sorts lexically.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DatabaseError::InvalidTimestamp {
            field: field.into(),
            value: value.into(),
        })
}

//! Database operations for tipline-server
//!
//! One module per entity. Timestamps are bound as RFC 3339 TEXT on every
//! write and parsed strictly on read; uuids travel as TEXT.

pub mod audit;
pub mod payments;
pub mod picks;
pub mod reputation;
pub mod tips;
pub mod users;
pub mod verifications;

use chrono::{DateTime, Utc};
use tipline_common::{Error, Result};
use uuid::Uuid;

pub(crate) fn parse_timestamp(raw: &str, column: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_opt_timestamp(
    raw: Option<String>,
    column: &str,
) -> Result<Option<DateTime<Utc>>> {
    raw.map(|s| parse_timestamp(&s, column)).transpose()
}

pub(crate) fn parse_uuid(raw: &str, column: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

pub(crate) fn parse_opt_uuid(raw: Option<String>, column: &str) -> Result<Option<Uuid>> {
    raw.map(|s| parse_uuid(&s, column)).transpose()
}

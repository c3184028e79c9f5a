//! Decoding of time-encoded ("snowflake") identifiers.
//!
//! The high 42 bits of every id hold the milliseconds elapsed since the
//! platform epoch, so ids sort in creation order and double as timestamps.

use chrono::{DateTime, Utc};

use crate::error::AppError;

/// Platform epoch, 2015-01-01T00:00:00Z, in Unix milliseconds.
pub const PLATFORM_EPOCH_MS: i64 = 1_420_070_400_000;

const TIMESTAMP_SHIFT: u32 = 22;

/// Parse an identifier as the unsigned integer it encodes.
pub fn parse_id(id: &str) -> Result<u64, AppError> {
    id.trim()
        .parse::<u64>()
        .map_err(|_| AppError::InvalidIdentifier(id.to_string()))
}

/// Unix milliseconds encoded in an identifier.
pub fn decode_millis(id: &str) -> Result<i64, AppError> {
    let raw = parse_id(id)?;
    Ok((raw >> TIMESTAMP_SHIFT) as i64 + PLATFORM_EPOCH_MS)
}

/// Creation time encoded in an identifier.
pub fn decode(id: &str) -> Result<DateTime<Utc>, AppError> {
    let millis = decode_millis(id)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| AppError::InvalidIdentifier(id.to_string()))
}

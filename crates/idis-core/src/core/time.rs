// crates/idis-core/src/core/time.rs
// ============================================================================
// Module: IDIS Time Model
// Description: RFC 3339 UTC timestamps for entities, ledgers, and audit events.
// Purpose: Provide a single timestamp representation with a stable wire form.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! IDIS persists every timestamp as RFC 3339 UTC with a trailing `Z`. The
//! debate path never reads the wall clock — its timestamps are derived from
//! round and step indices so replays are byte-identical. Other subsystems
//! capture [`Timestamp::now`] at mutation time.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;
use time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Timestamp parse and format errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum TimestampError {
    /// Value was not valid RFC 3339.
    #[error("invalid rfc3339 timestamp: {0}")]
    Parse(String),
    /// Value could not be formatted (out-of-range components).
    #[error("timestamp format failure: {0}")]
    Format(String),
}

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Canonical UTC timestamp used across IDIS records.
///
/// # Invariants
/// - Always UTC; serialization renders a trailing `Z`.
/// - Ordering follows the underlying instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

impl Timestamp {
    /// Captures the current wall-clock instant in UTC.
    #[must_use]
    pub fn now() -> Self {
        Self(OffsetDateTime::now_utc())
    }

    /// Builds a timestamp from unix seconds.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Parse`] when the value is out of range.
    pub fn from_unix_seconds(seconds: i64) -> Result<Self, TimestampError> {
        OffsetDateTime::from_unix_timestamp(seconds)
            .map(Self)
            .map_err(|err| TimestampError::Parse(err.to_string()))
    }

    /// Parses an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Parse`] when the value is not valid RFC 3339.
    pub fn parse(value: &str) -> Result<Self, TimestampError> {
        OffsetDateTime::parse(value, &Rfc3339)
            .map(|dt| Self(dt.to_offset(time::UtcOffset::UTC)))
            .map_err(|err| TimestampError::Parse(err.to_string()))
    }

    /// Renders the timestamp as RFC 3339 UTC.
    ///
    /// # Errors
    ///
    /// Returns [`TimestampError::Format`] when formatting fails.
    pub fn to_rfc3339(&self) -> Result<String, TimestampError> {
        self.0
            .format(&Rfc3339)
            .map_err(|err| TimestampError::Format(err.to_string()))
    }

    /// Returns the timestamp as unix seconds.
    #[must_use]
    pub const fn unix_seconds(&self) -> i64 {
        self.0.unix_timestamp()
    }

    /// Returns this instant shifted forward by `seconds`.
    #[must_use]
    pub fn plus_seconds(&self, seconds: i64) -> Self {
        Self(self.0.saturating_add(Duration::seconds(seconds)))
    }

    /// Returns whether this instant is strictly before `other`.
    #[must_use]
    pub fn is_before(&self, other: &Self) -> bool {
        self.0 < other.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => f.write_str("<invalid-timestamp>"),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::missing_docs_in_private_items,
        reason = "Test-only assertions are permitted."
    )]

    use super::*;

    #[test]
    fn parse_and_render_round_trips_utc() {
        let ts = Timestamp::parse("2026-03-01T12:30:00Z").unwrap();
        assert_eq!(ts.to_rfc3339().unwrap(), "2026-03-01T12:30:00Z");
    }

    #[test]
    fn offsets_normalize_to_utc() {
        let ts = Timestamp::parse("2026-03-01T14:30:00+02:00").unwrap();
        assert_eq!(ts.to_rfc3339().unwrap(), "2026-03-01T12:30:00Z");
    }

    #[test]
    fn ordering_follows_instants() {
        let earlier = Timestamp::parse("2026-03-01T00:00:00Z").unwrap();
        let later = earlier.plus_seconds(60);
        assert!(earlier.is_before(&later));
        assert!(!later.is_before(&earlier));
    }
}

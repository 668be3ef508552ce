// crates/fixtrail-core/src/model/timestamp.rs
// ============================================================================
// Module: fixtrail Time Model
// Description: Millisecond timestamps for fixes and upload envelopes.
// Purpose: Keep a single canonical time value and its wire rendering.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Fixes carry capture times as unix epoch milliseconds. The collector expects
//! `yyyy-MM-dd HH:mm:ss` strings in the agent's local offset, so rendering
//! takes an explicit [`UtcOffset`] that hosts resolve once at startup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use ::time::OffsetDateTime;
use ::time::UtcOffset;
use ::time::format_description::BorrowedFormatItem;
use ::time::macros::format_description;
use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wire format for collector timestamps (`yyyy-MM-dd HH:mm:ss`).
pub const WIRE_TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Nanoseconds per millisecond.
const NANOS_PER_MILLI: i128 = 1_000_000;

/// Nanoseconds per second.
const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Largest magnitude of a [`UtcOffset`] in seconds (25:59:59).
const MAX_OFFSET_SECONDS: i128 = 93_599;

// ============================================================================
// SECTION: Timestamp
// ============================================================================

/// Absolute timestamp with millisecond precision.
///
/// # Invariants
/// - Stored as unix epoch milliseconds; no timezone is attached.
/// - Ordering follows the numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Creates a timestamp from unix epoch milliseconds.
    #[must_use]
    pub const fn from_unix_millis(value: i64) -> Self {
        Self(value)
    }

    /// Returns the timestamp as unix epoch milliseconds.
    #[must_use]
    pub const fn as_unix_millis(self) -> i64 {
        self.0
    }

    /// Returns the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self(i64::try_from(now.as_millis()).unwrap_or(i64::MAX))
    }

    /// Returns the signed distance `self - earlier` in milliseconds.
    #[must_use]
    pub const fn millis_since(self, earlier: Self) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns true when the timestamp renders as a wire string under every
    /// possible offset.
    #[must_use]
    pub fn is_renderable(self) -> bool {
        let nanos = self.unix_nanos();
        let margin = MAX_OFFSET_SECONDS * NANOS_PER_SECOND;
        OffsetDateTime::from_unix_timestamp_nanos(nanos - margin).is_ok()
            && OffsetDateTime::from_unix_timestamp_nanos(nanos + margin).is_ok()
    }

    /// Renders the timestamp as `yyyy-MM-dd HH:mm:ss` in the given offset.
    ///
    /// # Errors
    ///
    /// Returns [`::time::Error`] when the shifted value is outside the
    /// representable calendar range or formatting fails.
    pub fn to_wire_string(self, offset: UtcOffset) -> Result<String, ::time::Error> {
        // Shift the instant so its UTC fields read as local wall-clock time.
        let shift = i128::from(offset.whole_seconds()) * NANOS_PER_SECOND;
        let local = OffsetDateTime::from_unix_timestamp_nanos(self.unix_nanos() + shift)?;
        Ok(local.format(WIRE_TIMESTAMP_FORMAT)?)
    }

    /// Returns the timestamp as unix epoch nanoseconds.
    fn unix_nanos(self) -> i128 {
        i128::from(self.0) * NANOS_PER_MILLI
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions are permitted."
    )]

    use ::time::UtcOffset;

    use super::Timestamp;

    #[test]
    fn wire_string_uses_utc_when_offset_is_zero() {
        let ts = Timestamp::from_unix_millis(1_700_000_000_123);
        assert_eq!(ts.to_wire_string(UtcOffset::UTC).unwrap(), "2023-11-14 22:13:20");
    }

    #[test]
    fn wire_string_applies_local_offset() {
        let sao_paulo = UtcOffset::from_hms(-3, 0, 0).unwrap();
        let ts = Timestamp::from_unix_millis(1_700_000_000_000);
        assert_eq!(ts.to_wire_string(sao_paulo).unwrap(), "2023-11-14 19:13:20");
    }

    #[test]
    fn wire_string_truncates_milliseconds() {
        let ts = Timestamp::from_unix_millis(999);
        assert_eq!(ts.to_wire_string(UtcOffset::UTC).unwrap(), "1970-01-01 00:00:00");
    }

    #[test]
    fn year_ten_thousand_is_not_renderable() {
        let ts = Timestamp::from_unix_millis(253_402_300_800_000);
        assert!(!ts.is_renderable());
        assert!(ts.to_wire_string(UtcOffset::UTC).is_err());
    }

    #[test]
    fn last_second_of_9999_is_rejected_for_positive_offsets() {
        let ts = Timestamp::from_unix_millis(253_402_300_799_000);
        let tokyo = UtcOffset::from_hms(9, 0, 0).unwrap();
        assert!(!ts.is_renderable());
        assert!(ts.to_wire_string(tokyo).is_err());
        assert_eq!(ts.to_wire_string(UtcOffset::UTC).unwrap(), "9999-12-31 23:59:59");
    }

    #[test]
    fn extreme_millis_do_not_panic() {
        assert!(!Timestamp::from_unix_millis(i64::MAX).is_renderable());
        assert!(!Timestamp::from_unix_millis(i64::MIN).is_renderable());
        assert!(Timestamp::from_unix_millis(i64::MIN).to_wire_string(UtcOffset::UTC).is_err());
    }

    #[test]
    fn millis_since_is_signed() {
        let early = Timestamp::from_unix_millis(1_000);
        let late = Timestamp::from_unix_millis(16_000);
        assert_eq!(late.millis_since(early), 15_000);
        assert_eq!(early.millis_since(late), -15_000);
    }
}

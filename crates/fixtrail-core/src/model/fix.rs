// crates/fixtrail-core/src/model/fix.rs
// ============================================================================
// Module: fixtrail Fix Model
// Description: Position fix values and their store-assigned identities.
// Purpose: Define the single record type buffered by sample stores.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`Fix`] is one captured position sample. Stores assign each appended fix
//! a [`FixId`] that increases monotonically and is never reused, even after a
//! clear.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::timestamp::Timestamp;

// ============================================================================
// SECTION: Fix
// ============================================================================

/// A single position sample.
///
/// # Invariants
/// - Immutable once created; stores persist it verbatim.
/// - `captured_at` is expected to be non-decreasing across appends but this
///   is not enforced (clock changes may violate it).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f32,
    /// Altitude in meters.
    pub altitude: f64,
    /// Ground speed in meters per second.
    pub speed: f32,
    /// Capture time.
    pub captured_at: Timestamp,
}

/// Fix validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FixError {
    /// A numeric field is NaN or infinite.
    #[error("fix field {0} must be finite")]
    NonFinite(&'static str),
    /// A coordinate is outside its valid range.
    #[error("fix field {field} out of range: {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value rendered as text.
        value: String,
    },
    /// The capture time cannot be rendered as a calendar date.
    #[error("fix captured_at {0} ms is outside the supported calendar range")]
    UnrenderableTime(i64),
}

impl Fix {
    /// Checks that every field can be persisted and serialized faithfully.
    ///
    /// # Errors
    ///
    /// Returns [`FixError`] when a value is non-finite, a coordinate is out
    /// of range, or the capture time has no wire rendering.
    pub fn validate(&self) -> Result<(), FixError> {
        let fields = [
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("accuracy", f64::from(self.accuracy)),
            ("altitude", self.altitude),
            ("speed", f64::from(self.speed)),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(FixError::NonFinite(name));
            }
        }
        if !(-90.0 ..= 90.0).contains(&self.latitude) {
            return Err(FixError::OutOfRange {
                field: "latitude",
                value: self.latitude.to_string(),
            });
        }
        if !(-180.0 ..= 180.0).contains(&self.longitude) {
            return Err(FixError::OutOfRange {
                field: "longitude",
                value: self.longitude.to_string(),
            });
        }
        if !self.captured_at.is_renderable() {
            return Err(FixError::UnrenderableTime(self.captured_at.as_unix_millis()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Stored Fix
// ============================================================================

/// Sequence identifier assigned by a sample store at append time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixId(i64);

impl FixId {
    /// Wraps a raw store identifier.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the raw identifier.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

/// A fix together with the identity the store assigned to it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredFix {
    /// Store-assigned sequence identifier.
    pub id: FixId,
    /// The persisted fix.
    pub fix: Fix,
}

/// Orders stored fixes newest first: `captured_at` descending, then id
/// descending for equal capture times.
pub fn sort_newest_first(fixes: &mut [StoredFix]) {
    fixes.sort_by(|a, b| {
        b.fix.captured_at.cmp(&a.fix.captured_at).then_with(|| b.id.cmp(&a.id))
    });
}

// ============================================================================
// SECTION: Tests
// ============================================================================

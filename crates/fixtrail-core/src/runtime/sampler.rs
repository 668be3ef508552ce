// crates/fixtrail-core/src/runtime/sampler.rs
// ============================================================================
// Module: fixtrail Sampler Adapters
// Description: Cadence filtering and a JSON-lines sampler implementation.
// Purpose: Turn an external fix feed into a paced Sampler.
// Dependencies: crate::{model, interfaces}, serde, serde_json
// ============================================================================

//! ## Overview
//! Position acquisition is a platform concern. [`JsonLinesSampler`] accepts
//! fixes as one JSON object per line (a pipe from a GNSS daemon, a FIFO, or a
//! replay file), which is enough to drive the agent outside a mobile OS.
//! [`CadenceGate`] enforces the fastest-interval rule every platform provider
//! applies.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;

use serde::Deserialize;

use crate::interfaces::Sampler;
use crate::interfaces::SamplerError;
use crate::interfaces::SamplingCadence;
use crate::model::Fix;
use crate::model::Timestamp;

// ============================================================================
// SECTION: Cadence Gate
// ============================================================================

/// Drops fixes delivered faster than the configured fastest interval.
#[derive(Debug, Clone)]
pub struct CadenceGate {
    /// Minimum spacing between accepted fixes in milliseconds.
    fastest_interval_ms: i64,
    /// Capture time of the last accepted fix.
    last_accepted: Option<Timestamp>,
}

impl CadenceGate {
    /// Creates a gate for the given cadence.
    #[must_use]
    pub fn new(cadence: SamplingCadence) -> Self {
        Self {
            fastest_interval_ms: i64::try_from(cadence.fastest_interval_ms).unwrap_or(i64::MAX),
            last_accepted: None,
        }
    }

    /// Returns true when the fix should be kept. A fix captured before the
    /// last accepted one (clock moved backwards) is always kept.
    pub fn admit(&mut self, fix: &Fix) -> bool {
        if let Some(last) = self.last_accepted {
            let elapsed = fix.captured_at.millis_since(last);
            if elapsed >= 0 && elapsed < self.fastest_interval_ms {
                return false;
            }
        }
        self.last_accepted = Some(fix.captured_at);
        true
    }
}

// ============================================================================
// SECTION: JSON Lines Sampler
// ============================================================================

/// One line of sampler input. Missing metadata defaults to zero and a missing
/// capture time is stamped on arrival.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct FixLine {
    /// Latitude in degrees.
    latitude: f64,
    /// Longitude in degrees.
    longitude: f64,
    /// Accuracy in meters.
    #[serde(default)]
    accuracy: f32,
    /// Altitude in meters.
    #[serde(default)]
    altitude: f64,
    /// Speed in meters per second.
    #[serde(default)]
    speed: f32,
    /// Capture time in unix milliseconds.
    #[serde(default)]
    captured_at: Option<i64>,
}

/// Sampler reading one JSON fix per line from a buffered reader.
pub struct JsonLinesSampler<R> {
    /// Line source.
    reader: R,
    /// Configured cadence.
    cadence: SamplingCadence,
    /// Reusable line buffer.
    line: String,
}

impl<R: BufRead + Send> JsonLinesSampler<R> {
    /// Creates a sampler over `reader`.
    #[must_use]
    pub const fn new(reader: R, cadence: SamplingCadence) -> Self {
        Self {
            reader,
            cadence,
            line: String::new(),
        }
    }
}

impl<R: BufRead + Send> Sampler for JsonLinesSampler<R> {
    fn cadence(&self) -> SamplingCadence {
        self.cadence
    }

    fn next_fix(&mut self) -> Result<Option<Fix>, SamplerError> {
        loop {
            self.line.clear();
            let read = self
                .reader
                .read_line(&mut self.line)
                .map_err(|err| SamplerError::Io(err.to_string()))?;
            if read == 0 {
                return Ok(None);
            }
            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let parsed: FixLine = serde_json::from_str(trimmed)
                .map_err(|err| SamplerError::Parse(err.to_string()))?;
            let fix = Fix {
                latitude: parsed.latitude,
                longitude: parsed.longitude,
                accuracy: parsed.accuracy,
                altitude: parsed.altitude,
                speed: parsed.speed,
                captured_at: parsed
                    .captured_at
                    .map_or_else(Timestamp::now, Timestamp::from_unix_millis),
            };
            fix.validate().map_err(|err| SamplerError::Parse(err.to_string()))?;
            return Ok(Some(fix));
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

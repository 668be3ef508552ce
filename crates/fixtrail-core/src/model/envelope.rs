// crates/fixtrail-core/src/model/envelope.rs
// ============================================================================
// Module: fixtrail Batch Envelope
// Description: Per-attempt upload payload and its collector wire format.
// Purpose: Bundle device identity and buffered fixes into one JSON body.
// Dependencies: serde, serde_json, thiserror, time
// ============================================================================

//! ## Overview
//! A [`BatchEnvelope`] exists only for the duration of one upload attempt. It
//! keeps the fixes exactly in store read order (newest first); the wire form
//! uses the collector's field names and `yyyy-MM-dd HH:mm:ss` timestamps.

// ============================================================================
// SECTION: Imports
// ============================================================================

use ::time::UtcOffset;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use super::fix::Fix;
use super::fix::StoredFix;
use super::timestamp::Timestamp;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Envelope serialization errors.
#[derive(Debug, Clone, Error)]
pub enum EnvelopeError {
    /// A timestamp could not be rendered in the wire format.
    #[error("envelope timestamp error: {0}")]
    Timestamp(String),
    /// JSON encoding failed.
    #[error("envelope json error: {0}")]
    Json(String),
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

/// Upload payload assembled at send time.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEnvelope {
    /// Stable per-install device identifier.
    pub device_id: String,
    /// Time the envelope was built.
    pub sent_at: Timestamp,
    /// Fixes in store read order.
    pub fixes: Vec<Fix>,
}

impl BatchEnvelope {
    /// Builds an envelope from fixes exactly as the store returned them.
    #[must_use]
    pub fn from_stored(device_id: &str, sent_at: Timestamp, stored: &[StoredFix]) -> Self {
        Self {
            device_id: device_id.to_string(),
            sent_at,
            fixes: stored.iter().map(|entry| entry.fix).collect(),
        }
    }

    /// Converts the envelope into its collector wire representation.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Timestamp`] when a timestamp cannot be rendered.
    pub fn to_wire(&self, offset: UtcOffset) -> Result<WireEnvelope, EnvelopeError> {
        let fixes = self
            .fixes
            .iter()
            .map(|fix| WireFix::from_fix(fix, offset))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WireEnvelope {
            device_id: self.device_id.clone(),
            sent_at: render(self.sent_at, offset)?,
            fixes,
        })
    }

    /// Serializes the envelope to the JSON request body.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError`] when rendering or JSON encoding fails.
    pub fn to_json_bytes(&self, offset: UtcOffset) -> Result<Vec<u8>, EnvelopeError> {
        let wire = self.to_wire(offset)?;
        serde_json::to_vec(&wire).map_err(|err| EnvelopeError::Json(err.to_string()))
    }
}

// ============================================================================
// SECTION: Wire Format
// ============================================================================

/// Collector request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireEnvelope {
    /// Device identifier.
    #[serde(rename = "dispositivo_id")]
    pub device_id: String,
    /// Send time, `yyyy-MM-dd HH:mm:ss`.
    #[serde(rename = "timestamp_envio")]
    pub sent_at: String,
    /// Fixes in store read order.
    #[serde(rename = "localizacoes")]
    pub fixes: Vec<WireFix>,
}

/// One fix as the collector receives it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFix {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy in meters.
    pub accuracy: f32,
    /// Altitude in meters.
    pub altitude: f64,
    /// Speed in meters per second.
    pub speed: f32,
    /// Capture time, `yyyy-MM-dd HH:mm:ss`.
    pub timestamp: String,
}

impl WireFix {
    /// Renders a fix in the collector format.
    fn from_fix(fix: &Fix, offset: UtcOffset) -> Result<Self, EnvelopeError> {
        Ok(Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy: fix.accuracy,
            altitude: fix.altitude,
            speed: fix.speed,
            timestamp: render(fix.captured_at, offset)?,
        })
    }
}

/// Renders a timestamp or maps the failure into an envelope error.
fn render(timestamp: Timestamp, offset: UtcOffset) -> Result<String, EnvelopeError> {
    timestamp.to_wire_string(offset).map_err(|err| EnvelopeError::Timestamp(err.to_string()))
}

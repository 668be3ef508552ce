// crates/fixtrail-core/src/model/mod.rs
// ============================================================================
// Module: fixtrail Core Model
// Description: Data model for fixes, timestamps, and batch envelopes.
// Purpose: Group the value types shared by stores, samplers, and uploads.
// Dependencies: serde, time
// ============================================================================

//! ## Overview
//! Value types only; nothing in this module performs I/O.

pub mod envelope;
pub mod fix;
pub mod timestamp;

pub use self::envelope::BatchEnvelope;
pub use self::envelope::EnvelopeError;
pub use self::envelope::WireEnvelope;
pub use self::envelope::WireFix;
pub use self::fix::Fix;
pub use self::fix::FixError;
pub use self::fix::FixId;
pub use self::fix::StoredFix;
pub use self::fix::sort_newest_first;
pub use self::timestamp::Timestamp;
pub use self::timestamp::WIRE_TIMESTAMP_FORMAT;

// crates/fixtrail-core/src/interfaces/mod.rs
// ============================================================================
// Module: fixtrail Interfaces
// Description: Backend-agnostic interfaces for storage, sampling, and upload.
// Purpose: Define the contract surfaces used by the fixtrail runtime.
// Dependencies: crate::model, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how fixtrail integrates with storage engines, position
//! providers, and network stacks without embedding backend-specific details.
//! Every failure is returned as a typed error; implementations must never
//! panic on I/O conditions.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::model::Fix;
use crate::model::FixId;
use crate::model::StoredFix;

// ============================================================================
// SECTION: Sample Store
// ============================================================================

/// Sample store errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("sample store io error: {0}")]
    Io(String),
    /// Store data is corrupted or fails integrity checks.
    #[error("sample store corruption: {0}")]
    Corrupt(String),
    /// Store data version is incompatible.
    #[error("sample store version mismatch: {0}")]
    VersionMismatch(String),
    /// Caller supplied data the store refuses to persist.
    #[error("sample store invalid data: {0}")]
    Invalid(String),
    /// Store reported an error.
    #[error("sample store error: {0}")]
    Store(String),
}

/// Durable buffer of fixes awaiting upload.
///
/// # Invariants
/// - `count()` reflects exactly the fixes appended since the last clear.
/// - Every operation is all-or-nothing; readers never observe partial rows.
/// - Implementations must tolerate `append` concurrently with
///   `read_all`/`clear`.
pub trait SampleStore: Send + Sync {
    /// Durably persists one fix and returns its sequence id. The write is
    /// committed to stable storage before this returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the fix is invalid or cannot be persisted.
    fn append(&self, fix: &Fix) -> Result<FixId, StoreError>;

    /// Returns every stored fix, `captured_at` descending (newest first).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn read_all(&self) -> Result<Vec<StoredFix>, StoreError>;

    /// Returns the number of stored fixes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store cannot be read.
    fn count(&self) -> Result<u64, StoreError>;

    /// Atomically removes every stored fix and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the removal cannot be committed; in that
    /// case no fix is removed.
    fn clear(&self) -> Result<u64, StoreError>;

    /// Atomically removes every fix whose id is at most `last`, leaving fixes
    /// appended afterwards in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the removal cannot be committed; in that
    /// case no fix is removed.
    fn clear_through(&self, last: FixId) -> Result<u64, StoreError>;

    /// Reports store readiness.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: Sampler
// ============================================================================

/// Default target interval between fixes (milliseconds).
pub const DEFAULT_SAMPLING_INTERVAL_MS: u64 = 30_000;
/// Default minimum interval between accepted fixes (milliseconds).
pub const DEFAULT_FASTEST_INTERVAL_MS: u64 = 15_000;

/// Cadence a sampler is asked to deliver fixes at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingCadence {
    /// Target interval between fixes in milliseconds.
    pub interval_ms: u64,
    /// Fixes arriving sooner than this after the last accepted one are dropped.
    pub fastest_interval_ms: u64,
}

impl Default for SamplingCadence {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SAMPLING_INTERVAL_MS,
            fastest_interval_ms: DEFAULT_FASTEST_INTERVAL_MS,
        }
    }
}

/// Sampler errors.
#[derive(Debug, Clone, Error)]
pub enum SamplerError {
    /// A delivered sample could not be decoded; the sampler can continue.
    #[error("sampler parse error: {0}")]
    Parse(String),
    /// No fix is currently available; the sampler can continue.
    #[error("sampler unavailable: {0}")]
    Unavailable(String),
    /// The underlying source failed and cannot deliver more fixes.
    #[error("sampler io error: {0}")]
    Io(String),
}

impl SamplerError {
    /// Returns true when the sampler may be polled again after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Unavailable(_))
    }
}

/// External provider of position fixes.
///
/// The sequence is possibly infinite and not restartable. Ordering is
/// approximate real-time arrival order; nothing stronger is guaranteed.
pub trait Sampler: Send {
    /// Cadence this sampler was configured with.
    fn cadence(&self) -> SamplingCadence;

    /// Blocks until the next fix is available. Returns `Ok(None)` once the
    /// source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`SamplerError`] when a sample cannot be produced.
    fn next_fix(&mut self) -> Result<Option<Fix>, SamplerError>;
}

// ============================================================================
// SECTION: Upload Transport
// ============================================================================

/// Content type of collector request bodies.
pub const UPLOAD_CONTENT_TYPE: &str = "application/json";

/// Single POST issued by the upload coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Absolute submission endpoint.
    pub endpoint: String,
    /// Serialized batch envelope.
    pub body: Vec<u8>,
}

/// Collector response as seen by the coordinator. The body is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
}

impl TransportResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Transport errors. Every variant means the exchange did not complete.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// Connecting, writing, or reading exceeded its timeout.
    #[error("upload transport timeout: {0}")]
    Timeout(String),
    /// The connection could not be established or was dropped.
    #[error("upload transport connection error: {0}")]
    Connect(String),
    /// Any other failure before a status was received.
    #[error("upload transport error: {0}")]
    Http(String),
}

/// Network stack used to deliver one batch.
pub trait UploadTransport: Send + Sync {
    /// Performs a single synchronous POST and returns the response status.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when no response status was received.
    fn post(&self, request: &UploadRequest) -> Result<TransportResponse, TransportError>;
}

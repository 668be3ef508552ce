// crates/fixtrail-core/src/runtime/upload.rs
// ============================================================================
// Module: fixtrail Upload Coordinator
// Description: Drains the sample store and uploads one batch per trigger.
// Purpose: Commit (truncate) the store only after the collector acknowledges.
// Dependencies: crate::{model, interfaces}, thiserror, time, url
// ============================================================================

//! ## Overview
//! [`UploadCoordinator::upload`] reads every stored fix, wraps them in a
//! [`BatchEnvelope`], POSTs the envelope once, and clears the uploaded fixes
//! only when the collector answers 2xx. Any other outcome leaves the store
//! untouched so the next trigger resends the same (possibly grown) batch.
//!
//! The clear covers exactly the fixes that were sent: fixes appended while
//! the POST was in flight have larger ids and survive it. A crash between
//! the acknowledgment and the clear causes the batch to be sent again; the
//! collector must tolerate duplicates because no idempotency key exists.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use ::time::UtcOffset;
use thiserror::Error;
use url::Url;

use crate::interfaces::SampleStore;
use crate::interfaces::StoreError;
use crate::interfaces::UploadRequest;
use crate::interfaces::UploadTransport;
use crate::model::BatchEnvelope;
use crate::model::EnvelopeError;
use crate::model::Timestamp;
use crate::runtime::events::AgentEvent;
use crate::runtime::events::AgentEventKind;
use crate::runtime::events::EventSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Path segment appended to the collector base URL.
pub const SUBMISSION_PATH: &str = "api/localizacoes";

// ============================================================================
// SECTION: Results
// ============================================================================

/// Outcome of one upload trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// The collector acknowledged the batch and the uploaded fixes were
    /// cleared.
    Success(usize),
    /// The store was empty; no request was made.
    Empty,
    /// The exchange did not complete (timeout, connection failure). The store
    /// is untouched.
    NetworkFailure(String),
    /// The collector answered with a non-2xx status. The store is untouched.
    ServerRejected(u16),
}

impl UploadResult {
    /// Stable label used in events and CLI output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Empty => "empty",
            Self::NetworkFailure(_) => "network_failure",
            Self::ServerRejected(_) => "server_rejected",
        }
    }
}

/// Upload failures that are not ordinary retryable outcomes.
#[derive(Debug, Clone, Error)]
pub enum UploadError {
    /// The collector base URL is blank or malformed.
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
    /// The device identifier is blank.
    #[error("device id must be non-empty")]
    InvalidDeviceId,
    /// The envelope could not be serialized.
    #[error("upload serialization failed: {0}")]
    Serialize(#[from] EnvelopeError),
    /// The store could not be read; nothing was sent.
    #[error("upload could not read the sample store: {0}")]
    Read(StoreError),
    /// The collector acknowledged the batch but the local clear failed. The
    /// next upload will resend these fixes.
    #[error("collector acknowledged {uploaded} fixes but clearing them failed: {source}")]
    ClearAfterAck {
        /// Fixes the collector acknowledged.
        uploaded: usize,
        /// Underlying store failure.
        source: StoreError,
    },
    /// Another upload on this coordinator has not finished yet.
    #[error("an upload is already in progress")]
    InFlight,
}

// ============================================================================
// SECTION: Coordinator
// ============================================================================

/// Drains a sample store into a collector with commit-on-ack semantics.
pub struct UploadCoordinator {
    /// Shared sample store.
    store: Arc<dyn SampleStore>,
    /// Network transport.
    transport: Arc<dyn UploadTransport>,
    /// Event destination.
    events: Arc<dyn EventSink>,
    /// Offset used to render wire timestamps.
    offset: UtcOffset,
    /// Set while an upload is running.
    in_flight: AtomicBool,
}

impl UploadCoordinator {
    /// Creates a coordinator over a shared store and transport.
    #[must_use]
    pub fn new(
        store: Arc<dyn SampleStore>,
        transport: Arc<dyn UploadTransport>,
        events: Arc<dyn EventSink>,
        offset: UtcOffset,
    ) -> Self {
        Self {
            store,
            transport,
            events,
            offset,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Uploads every stored fix to `{server_url}/api/localizacoes`.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError`] for invalid inputs, store failures, a
    /// concurrent upload, or a failed clear after acknowledgment. Network
    /// failures and collector rejections are [`UploadResult`] variants.
    pub fn upload(&self, server_url: &str, device_id: &str) -> Result<UploadResult, UploadError> {
        let endpoint = submission_endpoint(server_url)?;
        if device_id.trim().is_empty() {
            return Err(UploadError::InvalidDeviceId);
        }
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let stored = self.store.read_all().map_err(UploadError::Read)?;
        let Some(last) = stored.iter().map(|entry| entry.id).max() else {
            self.finished(&UploadResult::Empty, 0, None);
            return Ok(UploadResult::Empty);
        };
        let count = stored.len();
        let envelope = BatchEnvelope::from_stored(device_id, Timestamp::now(), &stored);
        let body = envelope.to_json_bytes(self.offset)?;

        self.events.record(&AgentEvent::now(AgentEventKind::UploadStarted {
            endpoint: endpoint.clone(),
            fixes: count,
        }));
        let request = UploadRequest {
            endpoint,
            body,
        };
        let response = match self.transport.post(&request) {
            Ok(response) => response,
            Err(err) => {
                let result = UploadResult::NetworkFailure(err.to_string());
                self.finished(&result, count, None);
                return Ok(result);
            }
        };
        if !response.is_success() {
            let result = UploadResult::ServerRejected(response.status);
            self.finished(&result, count, Some(response.status));
            return Ok(result);
        }
        if let Err(source) = self.store.clear_through(last) {
            self.events.record(&AgentEvent::now(AgentEventKind::UploadFinished {
                outcome: "clear_failed",
                fixes: count,
                status: Some(response.status),
                message: Some(source.to_string()),
            }));
            return Err(UploadError::ClearAfterAck {
                uploaded: count,
                source,
            });
        }
        let result = UploadResult::Success(count);
        self.finished(&result, count, Some(response.status));
        Ok(result)
    }

    /// Records the upload-finished event for an outcome.
    fn finished(&self, result: &UploadResult, fixes: usize, status: Option<u16>) {
        let message = match result {
            UploadResult::NetworkFailure(reason) => Some(reason.clone()),
            _ => None,
        };
        self.events.record(&AgentEvent::now(AgentEventKind::UploadFinished {
            outcome: result.label(),
            fixes,
            status,
            message,
        }));
    }
}

/// Clears the in-flight flag when an upload ends.
struct InFlightGuard<'a> {
    /// Flag owned by the coordinator.
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// Claims the flag or reports a concurrent upload.
    fn acquire(flag: &'a AtomicBool) -> Result<Self, UploadError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| UploadError::InFlight)?;
        Ok(Self {
            flag,
        })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

// ============================================================================
// SECTION: Endpoint
// ============================================================================

/// Builds the submission endpoint from a collector base URL, keeping exactly
/// one `/` between base and path.
///
/// # Errors
///
/// Returns [`UploadError::InvalidUrl`] when the base is blank, unparsable, not
/// `http`/`https`, or has no host.
pub fn submission_endpoint(server_url: &str) -> Result<String, UploadError> {
    let base = server_url.trim();
    if base.is_empty() {
        return Err(UploadError::InvalidUrl("server url must be non-empty".to_string()));
    }
    let endpoint = format!("{}/{SUBMISSION_PATH}", base.trim_end_matches('/'));
    let parsed = Url::parse(&endpoint).map_err(|err| UploadError::InvalidUrl(err.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UploadError::InvalidUrl(format!("unsupported scheme: {scheme}"))),
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(UploadError::InvalidUrl("server url has no host".to_string()));
    }
    Ok(endpoint)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

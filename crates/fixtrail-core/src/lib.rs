// crates/fixtrail-core/src/lib.rs
// ============================================================================
// Module: fixtrail Core Library
// Description: Public API surface for the fixtrail core.
// Purpose: Expose the fix model, store/sampler/transport interfaces, and the
//          upload and sampling runtime.
// Dependencies: crate::{model, interfaces, runtime}
// ============================================================================

//! ## Overview
//! fixtrail core buffers position fixes in a durable sample store and uploads
//! them in batches with all-or-nothing commit semantics: the store is only
//! truncated after the collector acknowledges the batch. Storage engines,
//! network transports, and position samplers integrate through the explicit
//! interfaces in [`interfaces`].

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod model;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use model::*;

pub use interfaces::SampleStore;
pub use interfaces::Sampler;
pub use interfaces::SamplerError;
pub use interfaces::SamplingCadence;
pub use interfaces::StoreError;
pub use interfaces::TransportError;
pub use interfaces::TransportResponse;
pub use interfaces::UploadRequest;
pub use interfaces::UploadTransport;
pub use runtime::AgentEvent;
pub use runtime::AgentEventKind;
pub use runtime::CadenceGate;
pub use runtime::EventSink;
pub use runtime::FileEventSink;
pub use runtime::InMemorySampleStore;
pub use runtime::JsonLinesSampler;
pub use runtime::MemoryEventSink;
pub use runtime::NoopEventSink;
pub use runtime::SamplingReport;
pub use runtime::SamplingSession;
pub use runtime::StderrEventSink;
pub use runtime::UploadCoordinator;
pub use runtime::UploadError;
pub use runtime::UploadResult;
pub use runtime::submission_endpoint;

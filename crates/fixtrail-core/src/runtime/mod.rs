// crates/fixtrail-core/src/runtime/mod.rs
// ============================================================================
// Module: fixtrail Runtime
// Description: Upload coordination, sampling sessions, and in-memory helpers.
// Purpose: Drive fixes from samplers into stores and from stores to collectors.
// Dependencies: crate::{model, interfaces}, tokio
// ============================================================================

//! ## Overview
//! The runtime holds the stateful pieces: the [`UploadCoordinator`] that
//! drains a store with commit-on-ack semantics, the [`SamplingSession`] that
//! feeds sampler output into a store, and the event sinks both report to.

pub mod events;
pub mod sampler;
pub mod sampling;
pub mod store;
pub mod upload;

pub use events::AgentEvent;
pub use events::AgentEventKind;
pub use events::EventSink;
pub use events::FileEventSink;
pub use events::MemoryEventSink;
pub use events::NoopEventSink;
pub use events::StderrEventSink;
pub use sampler::CadenceGate;
pub use sampler::JsonLinesSampler;
pub use sampling::SamplingReport;
pub use sampling::SamplingSession;
pub use store::InMemorySampleStore;
pub use upload::SUBMISSION_PATH;
pub use upload::UploadCoordinator;
pub use upload::UploadError;
pub use upload::UploadResult;
pub use upload::submission_endpoint;

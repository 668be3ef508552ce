// crates/fixtrail-uplink/src/lib.rs
// ============================================================================
// Module: fixtrail Uplink
// Description: Network transports for uploading fix batches.
// Purpose: Implement the core UploadTransport over HTTP.
// Dependencies: fixtrail-core, reqwest, url
// ============================================================================

//! ## Overview
//! The uplink crate carries batches from the agent to the collector. The
//! only transport today is [`HttpTransport`], a blocking `reqwest` client
//! configured for single-shot POSTs with bounded timeouts.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::CONNECT_TIMEOUT;
pub use http::HttpTransport;
pub use http::REQUEST_TIMEOUT;
pub use http::UplinkError;

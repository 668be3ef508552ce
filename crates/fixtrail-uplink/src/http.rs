// crates/fixtrail-uplink/src/http.rs
// ============================================================================
// Module: fixtrail HTTP Transport
// Description: Blocking HTTP POST transport for batch uploads.
// Purpose: Deliver one JSON batch per call and report the response status.
// Dependencies: fixtrail-core, reqwest, url
// ============================================================================

//! ## Overview
//! [`HttpTransport`] issues a single `POST` per upload with a JSON body and
//! reports the status code. Redirects are not followed: a 3xx answer is
//! returned as-is so the coordinator treats it as a rejection. Connect,
//! write, and read are bounded by 30 second timeouts.
//!
//! The underlying client is blocking. Build and call it outside async
//! contexts (or inside `spawn_blocking`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use fixtrail_core::TransportError;
use fixtrail_core::TransportResponse;
use fixtrail_core::UploadRequest;
use fixtrail_core::UploadTransport;
use fixtrail_core::interfaces::UPLOAD_CONTENT_TYPE;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use thiserror::Error;
use url::Url;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Timeout for establishing a connection.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout covering the whole exchange, including write and read.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// User agent sent with every upload.
const USER_AGENT: &str = concat!("fixtrail/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building the transport.
#[derive(Debug, Error)]
pub enum UplinkError {
    /// The HTTP client could not be constructed.
    #[error("uplink client error: {0}")]
    Client(String),
}

// ============================================================================
// SECTION: HTTP Transport
// ============================================================================

/// HTTP-backed upload transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// HTTP client used for upload requests.
    client: Client,
}

impl HttpTransport {
    /// Builds an HTTP transport with the default client.
    ///
    /// # Errors
    ///
    /// Returns [`UplinkError`] when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, UplinkError> {
        let client = Client::builder()
            .redirect(Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| UplinkError::Client(err.to_string()))?;
        Ok(Self {
            client,
        })
    }

    /// Creates an HTTP transport with a preconfigured client.
    #[must_use]
    pub const fn with_client(client: Client) -> Self {
        Self {
            client,
        }
    }
}

impl UploadTransport for HttpTransport {
    fn post(&self, request: &UploadRequest) -> Result<TransportResponse, TransportError> {
        let url =
            Url::parse(&request.endpoint).map_err(|err| TransportError::Http(err.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(TransportError::Http(format!("unsupported scheme: {scheme}")));
            }
        }

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, UPLOAD_CONTENT_TYPE)
            .body(request.body.clone())
            .send()
            .map_err(|err| classify(&err))?;
        Ok(TransportResponse {
            status: response.status().as_u16(),
        })
    }
}

/// Maps a client error onto the transport error taxonomy.
fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Http(err.to_string())
    }
}

// crates/fixtrail-uplink/tests/http_transport.rs
// ============================================================================
// Module: HttpTransport Tests
// Description: Uploads against local mock collectors.
// Purpose: Verify request shape, status mapping, and store effects end to end.
// ============================================================================

//! ## Overview
//! Runs the upload coordinator over [`HttpTransport`] against `tiny_http`
//! collectors that acknowledge, reject, stall, or redirect.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use fixtrail_core::Fix;
use fixtrail_core::InMemorySampleStore;
use fixtrail_core::NoopEventSink;
use fixtrail_core::SampleStore;
use fixtrail_core::Timestamp;
use fixtrail_core::UploadCoordinator;
use fixtrail_core::UploadResult;
use fixtrail_core::WireEnvelope;
use fixtrail_uplink::HttpTransport;
use reqwest::blocking::Client;
use reqwest::redirect::Policy;
use time::UtcOffset;
use tiny_http::Header;
use tiny_http::Method;
use tiny_http::Response;
use tiny_http::Server;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const T0: i64 = 1_700_000_000_000;

/// Request as observed by the mock collector.
struct Captured {
    method: Method,
    path: String,
    content_type: Option<String>,
    body: String,
}

fn seeded_store() -> Arc<InMemorySampleStore> {
    let store = Arc::new(InMemorySampleStore::new());
    store
        .append(&Fix {
            latitude: -23.55,
            longitude: -46.63,
            accuracy: 5.0,
            altitude: 760.0,
            speed: 0.0,
            captured_at: Timestamp::from_unix_millis(T0),
        })
        .unwrap();
    store
        .append(&Fix {
            latitude: -23.56,
            longitude: -46.64,
            accuracy: 8.0,
            altitude: 762.0,
            speed: 1.2,
            captured_at: Timestamp::from_unix_millis(T0 + 30_000),
        })
        .unwrap();
    store
}

/// Serves one request with `status`, returning what the collector saw.
fn collector(status: u16, delay: Duration) -> (String, JoinHandle<Option<Captured>>) {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let base = format!("http://{}", server.server_addr());
    let handle = thread::spawn(move || {
        let mut request = server.recv_timeout(Duration::from_secs(5)).ok().flatten()?;
        let mut body = String::new();
        request.as_reader().read_to_string(&mut body).expect("request body");
        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.as_str().to_string());
        let captured = Captured {
            method: request.method().clone(),
            path: request.url().to_string(),
            content_type,
            body,
        };
        thread::sleep(delay);
        let response = Response::from_string("ok")
            .with_status_code(status)
            .with_header(Header::from_bytes("Location", "http://127.0.0.1:1/elsewhere").unwrap());
        let _ = request.respond(response);
        Some(captured)
    });
    (base, handle)
}

fn coordinator(store: Arc<InMemorySampleStore>, transport: HttpTransport) -> UploadCoordinator {
    UploadCoordinator::new(store, Arc::new(transport), Arc::new(NoopEventSink), UtcOffset::UTC)
}

// ============================================================================
// SECTION: Constructor Tests
// ============================================================================

#[test]
fn http_transport_new_creates_default_client() {
    assert!(HttpTransport::new().is_ok());
}

// ============================================================================
// SECTION: Outcome Tests
// ============================================================================

#[test]
fn acknowledged_upload_posts_json_and_clears_store() {
    let (base, handle) = collector(200, Duration::ZERO);
    let store = seeded_store();
    let coordinator = coordinator(store.clone(), HttpTransport::new().unwrap());

    let result = coordinator.upload(&format!("{base}/"), "device-1").unwrap();

    assert_eq!(result, UploadResult::Success(2));
    assert!(store.read_all().unwrap().is_empty());
    let captured = handle.join().unwrap().expect("request received");
    assert_eq!(captured.method, Method::Post);
    assert_eq!(captured.path, "/api/localizacoes");
    assert_eq!(captured.content_type.as_deref(), Some("application/json"));
    let envelope: WireEnvelope = serde_json::from_str(&captured.body).unwrap();
    assert_eq!(envelope.device_id, "device-1");
    assert_eq!(envelope.fixes.len(), 2);
    assert_eq!(envelope.fixes[0].timestamp, "2023-11-14 22:13:50");
    assert_eq!(envelope.fixes[1].timestamp, "2023-11-14 22:13:20");
}

#[test]
fn server_error_preserves_store() {
    let (base, handle) = collector(500, Duration::ZERO);
    let store = seeded_store();
    let before = store.read_all().unwrap();
    let coordinator = coordinator(store.clone(), HttpTransport::new().unwrap());

    let result = coordinator.upload(&base, "device-1").unwrap();

    assert_eq!(result, UploadResult::ServerRejected(500));
    assert_eq!(store.read_all().unwrap(), before);
    handle.join().unwrap();
}

#[test]
fn redirect_is_not_followed() {
    let (base, handle) = collector(302, Duration::ZERO);
    let store = seeded_store();
    let coordinator = coordinator(store.clone(), HttpTransport::new().unwrap());

    assert_eq!(coordinator.upload(&base, "device-1").unwrap(), UploadResult::ServerRejected(302));
    assert_eq!(store.count().unwrap(), 2);
    handle.join().unwrap();
}

#[test]
fn stalled_collector_times_out_and_preserves_store() {
    let (base, handle) = collector(200, Duration::from_millis(1_500));
    let store = seeded_store();
    let client = Client::builder()
        .redirect(Policy::none())
        .timeout(Duration::from_millis(300))
        .build()
        .expect("custom client");
    let coordinator = coordinator(store.clone(), HttpTransport::with_client(client));

    let result = coordinator.upload(&base, "device-1").unwrap();

    assert!(matches!(result, UploadResult::NetworkFailure(_)), "got {result:?}");
    assert_eq!(store.count().unwrap(), 2);
    handle.join().unwrap();
}

#[test]
fn unreachable_collector_is_a_network_failure() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let store = seeded_store();
    let coordinator = coordinator(store.clone(), HttpTransport::new().unwrap());

    let result = coordinator.upload(&format!("http://127.0.0.1:{port}"), "device-1").unwrap();

    assert!(matches!(result, UploadResult::NetworkFailure(_)), "got {result:?}");
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn empty_store_makes_no_request() {
    let server = Server::http("127.0.0.1:0").expect("http server");
    let base = format!("http://{}", server.server_addr());
    let coordinator =
        coordinator(Arc::new(InMemorySampleStore::new()), HttpTransport::new().unwrap());

    assert_eq!(coordinator.upload(&base, "device-1").unwrap(), UploadResult::Empty);
    assert!(server.recv_timeout(Duration::from_millis(200)).unwrap().is_none());
}

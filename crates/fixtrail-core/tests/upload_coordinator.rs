// crates/fixtrail-core/tests/upload_coordinator.rs
// ============================================================================
// Module: Upload Coordinator Tests
// Description: Commit-on-ack semantics of batch uploads.
// Purpose: Ensure the store is cleared only after a 2xx acknowledgment.
// ============================================================================

//! ## Overview
//! Drives [`UploadCoordinator`] against scripted transports and verifies store
//! state, request bodies, and emitted events for every outcome.

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

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use fixtrail_core::AgentEventKind;
use fixtrail_core::Fix;
use fixtrail_core::FixId;
use fixtrail_core::InMemorySampleStore;
use fixtrail_core::MemoryEventSink;
use fixtrail_core::NoopEventSink;
use fixtrail_core::SampleStore;
use fixtrail_core::StoreError;
use fixtrail_core::StoredFix;
use fixtrail_core::Timestamp;
use fixtrail_core::TransportError;
use fixtrail_core::TransportResponse;
use fixtrail_core::UploadCoordinator;
use fixtrail_core::UploadError;
use fixtrail_core::UploadRequest;
use fixtrail_core::UploadResult;
use fixtrail_core::UploadTransport;
use fixtrail_core::WireEnvelope;
use time::UtcOffset;

// ============================================================================
// SECTION: Helpers
// ============================================================================

const SERVER: &str = "http://collector.test:5000";
const T0: i64 = 1_700_000_000_000;
const T1: i64 = 1_700_000_030_000;

fn first_fix() -> Fix {
    Fix {
        latitude: -23.55,
        longitude: -46.63,
        accuracy: 5.0,
        altitude: 760.0,
        speed: 0.0,
        captured_at: Timestamp::from_unix_millis(T0),
    }
}

fn second_fix() -> Fix {
    Fix {
        latitude: -23.56,
        longitude: -46.64,
        accuracy: 8.0,
        altitude: 762.0,
        speed: 1.2,
        captured_at: Timestamp::from_unix_millis(T1),
    }
}

enum Reply {
    Status(u16),
    Fail(TransportError),
}

/// Transport that records requests and answers with a fixed reply.
struct ScriptedTransport {
    reply: Reply,
    requests: Mutex<Vec<UploadRequest>>,
}

impl ScriptedTransport {
    fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_body(&self) -> WireEnvelope {
        let requests = self.requests.lock().unwrap();
        let request = requests.last().expect("request recorded");
        serde_json::from_slice(&request.body).unwrap()
    }
}

impl UploadTransport for ScriptedTransport {
    fn post(&self, request: &UploadRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Reply::Status(status) => Ok(TransportResponse {
                status: *status,
            }),
            Reply::Fail(err) => Err(err.clone()),
        }
    }
}

/// Transport that appends a fix to the store while the POST is in flight.
struct AppendingTransport {
    store: Arc<InMemorySampleStore>,
}

impl UploadTransport for AppendingTransport {
    fn post(&self, _request: &UploadRequest) -> Result<TransportResponse, TransportError> {
        let mut late = second_fix();
        late.captured_at = Timestamp::from_unix_millis(T1 + 60_000);
        self.store.append(&late).unwrap();
        Ok(TransportResponse {
            status: 200,
        })
    }
}

/// Store whose clears always fail.
struct ClearFailingStore {
    inner: InMemorySampleStore,
}

impl SampleStore for ClearFailingStore {
    fn append(&self, fix: &Fix) -> Result<FixId, StoreError> {
        self.inner.append(fix)
    }

    fn read_all(&self) -> Result<Vec<StoredFix>, StoreError> {
        self.inner.read_all()
    }

    fn count(&self) -> Result<u64, StoreError> {
        self.inner.count()
    }

    fn clear(&self) -> Result<u64, StoreError> {
        Err(StoreError::Io("disk full".to_string()))
    }

    fn clear_through(&self, _last: FixId) -> Result<u64, StoreError> {
        Err(StoreError::Io("disk full".to_string()))
    }
}

/// Store whose reads always fail and which counts clear attempts.
#[derive(Default)]
struct ReadFailingStore {
    clears: AtomicUsize,
}

impl SampleStore for ReadFailingStore {
    fn append(&self, _fix: &Fix) -> Result<FixId, StoreError> {
        Ok(FixId::new(1))
    }

    fn read_all(&self) -> Result<Vec<StoredFix>, StoreError> {
        Err(StoreError::Corrupt("fix 1: latitude out of range".to_string()))
    }

    fn count(&self) -> Result<u64, StoreError> {
        Ok(1)
    }

    fn clear(&self) -> Result<u64, StoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    fn clear_through(&self, _last: FixId) -> Result<u64, StoreError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }
}

fn seeded_store() -> Arc<InMemorySampleStore> {
    let store = Arc::new(InMemorySampleStore::new());
    store.append(&first_fix()).unwrap();
    store.append(&second_fix()).unwrap();
    store
}

fn coordinator(
    store: Arc<dyn SampleStore>,
    transport: Arc<dyn UploadTransport>,
) -> UploadCoordinator {
    UploadCoordinator::new(store, transport, Arc::new(NoopEventSink), UtcOffset::UTC)
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

#[test]
fn success_clears_store_and_reports_count() {
    let store = seeded_store();
    let transport = ScriptedTransport::new(Reply::Status(200));
    let coordinator = coordinator(store.clone(), transport.clone());

    let result = coordinator.upload(SERVER, "device-1").unwrap();

    assert_eq!(result, UploadResult::Success(2));
    assert_eq!(store.count().unwrap(), 0);
    assert!(store.read_all().unwrap().is_empty());
    assert_eq!(transport.calls(), 1);
    let requests = transport.requests.lock().unwrap();
    assert_eq!(requests[0].endpoint, "http://collector.test:5000/api/localizacoes");
}

#[test]
fn any_2xx_status_counts_as_acknowledgment() {
    let store = seeded_store();
    let coordinator = coordinator(store.clone(), ScriptedTransport::new(Reply::Status(204)));
    assert_eq!(coordinator.upload(SERVER, "device-1").unwrap(), UploadResult::Success(2));
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn server_rejection_preserves_store() {
    let store = seeded_store();
    let before = store.read_all().unwrap();
    let coordinator = coordinator(store.clone(), ScriptedTransport::new(Reply::Status(500)));

    let result = coordinator.upload(SERVER, "device-1").unwrap();

    assert_eq!(result, UploadResult::ServerRejected(500));
    assert_eq!(store.read_all().unwrap(), before);
}

#[test]
fn redirect_status_is_a_rejection() {
    let store = seeded_store();
    let coordinator = coordinator(store.clone(), ScriptedTransport::new(Reply::Status(302)));
    assert_eq!(coordinator.upload(SERVER, "device-1").unwrap(), UploadResult::ServerRejected(302));
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn network_timeout_preserves_store() {
    let store = seeded_store();
    let before = store.read_all().unwrap();
    let transport =
        ScriptedTransport::new(Reply::Fail(TransportError::Timeout("read timed out".to_string())));
    let coordinator = coordinator(store.clone(), transport);

    let result = coordinator.upload(SERVER, "device-1").unwrap();

    let UploadResult::NetworkFailure(reason) = result else {
        panic!("expected network failure, got {result:?}");
    };
    assert!(reason.contains("timeout"));
    assert_eq!(store.read_all().unwrap(), before);
}

#[test]
fn empty_store_short_circuits_without_network_call() {
    let store = Arc::new(InMemorySampleStore::new());
    let transport = ScriptedTransport::new(Reply::Status(200));
    let coordinator = coordinator(store, transport.clone());

    assert_eq!(coordinator.upload(SERVER, "device-1").unwrap(), UploadResult::Empty);
    assert_eq!(transport.calls(), 0);
}

#[test]
fn failed_upload_is_retried_with_the_same_batch() {
    let store = seeded_store();
    let failing = coordinator(store.clone(), ScriptedTransport::new(Reply::Status(503)));
    assert_eq!(failing.upload(SERVER, "device-1").unwrap(), UploadResult::ServerRejected(503));

    let transport = ScriptedTransport::new(Reply::Status(200));
    let retry = coordinator(store.clone(), transport.clone());
    assert_eq!(retry.upload(SERVER, "device-1").unwrap(), UploadResult::Success(2));
    assert_eq!(transport.last_body().fixes.len(), 2);
}

// ============================================================================
// SECTION: Envelope
// ============================================================================

#[test]
fn body_matches_store_order_and_fields() {
    let store = seeded_store();
    let transport = ScriptedTransport::new(Reply::Status(200));
    let coordinator = coordinator(store, transport.clone());

    coordinator.upload(SERVER, "device-1").unwrap();

    let body = transport.last_body();
    assert_eq!(body.device_id, "device-1");
    assert_eq!(body.fixes.len(), 2);
    let newest = &body.fixes[0];
    assert!((newest.latitude - -23.56).abs() < f64::EPSILON);
    assert!((newest.longitude - -46.64).abs() < f64::EPSILON);
    assert!((newest.accuracy - 8.0).abs() < f32::EPSILON);
    assert!((newest.altitude - 762.0).abs() < f64::EPSILON);
    assert!((newest.speed - 1.2).abs() < f32::EPSILON);
    assert_eq!(newest.timestamp, "2023-11-14 22:13:50");
    assert_eq!(body.fixes[1].timestamp, "2023-11-14 22:13:20");
    assert_eq!(body.sent_at.len(), "yyyy-MM-dd HH:mm:ss".len());
}

#[test]
fn body_uses_collector_field_names() {
    let store = seeded_store();
    let transport = ScriptedTransport::new(Reply::Status(200));
    coordinator(store, transport.clone()).upload(SERVER, "device-1").unwrap();

    let requests = transport.requests.lock().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let object = value.as_object().unwrap();
    assert!(object.contains_key("dispositivo_id"));
    assert!(object.contains_key("timestamp_envio"));
    let fixes = object["localizacoes"].as_array().unwrap();
    let keys: Vec<&str> = fixes[0].as_object().unwrap().keys().map(String::as_str).collect();
    for key in ["latitude", "longitude", "accuracy", "altitude", "speed", "timestamp"] {
        assert!(keys.contains(&key), "missing {key}");
    }
}

// ============================================================================
// SECTION: Edge Cases
// ============================================================================

#[test]
fn fixes_appended_during_upload_survive_the_clear() {
    let store = seeded_store();
    let transport = Arc::new(AppendingTransport {
        store: store.clone(),
    });
    let coordinator = coordinator(store.clone(), transport);

    assert_eq!(coordinator.upload(SERVER, "device-1").unwrap(), UploadResult::Success(2));

    let remaining = store.read_all().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].fix.captured_at, Timestamp::from_unix_millis(T1 + 60_000));
}

#[test]
fn clear_failure_after_ack_is_reported() {
    let inner = InMemorySampleStore::new();
    inner.append(&first_fix()).unwrap();
    let store = Arc::new(ClearFailingStore {
        inner,
    });
    let events = Arc::new(MemoryEventSink::new());
    let coordinator = UploadCoordinator::new(
        store.clone(),
        ScriptedTransport::new(Reply::Status(200)),
        events.clone(),
        UtcOffset::UTC,
    );

    let err = coordinator.upload(SERVER, "device-1").unwrap_err();

    assert!(matches!(err, UploadError::ClearAfterAck { uploaded: 1, .. }));
    assert_eq!(store.count().unwrap(), 1);
    let outcomes: Vec<&'static str> = events
        .events()
        .iter()
        .filter_map(|event| match event.kind {
            AgentEventKind::UploadFinished {
                outcome, ..
            } => Some(outcome),
            _ => None,
        })
        .collect();
    assert_eq!(outcomes, vec!["clear_failed"]);
}

#[test]
fn device_id_is_sent_exactly_as_given() {
    let transport = ScriptedTransport::new(Reply::Status(200));
    coordinator(seeded_store(), transport.clone()).upload(SERVER, " Phone 1 ").unwrap();
    assert_eq!(transport.last_body().device_id, " Phone 1 ");
}

#[test]
fn store_read_failure_aborts_before_sending() {
    let store = Arc::new(ReadFailingStore::default());
    let transport = ScriptedTransport::new(Reply::Status(200));
    let coordinator = coordinator(store.clone(), transport.clone());

    let err = coordinator.upload(SERVER, "device-1").unwrap_err();

    assert!(matches!(err, UploadError::Read(StoreError::Corrupt(_))));
    assert_eq!(transport.calls(), 0);
    assert_eq!(store.clears.load(Ordering::SeqCst), 0);
}

#[test]
fn unrenderable_capture_time_never_enters_the_batch() {
    let store = seeded_store();
    let mut far_future = first_fix();
    far_future.captured_at = Timestamp::from_unix_millis(253_402_300_800_000);
    assert!(matches!(store.append(&far_future), Err(StoreError::Invalid(_))));

    let transport = ScriptedTransport::new(Reply::Status(200));
    let coordinator = coordinator(store.clone(), transport.clone());

    assert_eq!(coordinator.upload(SERVER, "device-1").unwrap(), UploadResult::Success(2));
    assert_eq!(transport.last_body().fixes.len(), 2);
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn invalid_inputs_are_rejected_before_reading_the_store() {
    let transport = ScriptedTransport::new(Reply::Status(200));
    let coordinator = coordinator(seeded_store(), transport.clone());

    assert!(matches!(coordinator.upload("", "device-1"), Err(UploadError::InvalidUrl(_))));
    assert!(matches!(coordinator.upload(SERVER, "  "), Err(UploadError::InvalidDeviceId)));
    assert_eq!(transport.calls(), 0);
}

#[test]
fn concurrent_upload_reports_in_flight() {
    struct ReentrantTransport {
        coordinator: Mutex<Option<Arc<UploadCoordinator>>>,
        nested: Mutex<Option<Result<UploadResult, UploadError>>>,
    }

    impl UploadTransport for ReentrantTransport {
        fn post(&self, _request: &UploadRequest) -> Result<TransportResponse, TransportError> {
            let coordinator = self.coordinator.lock().unwrap().clone().unwrap();
            *self.nested.lock().unwrap() = Some(coordinator.upload(SERVER, "device-1"));
            Ok(TransportResponse {
                status: 200,
            })
        }
    }

    let store = seeded_store();
    let transport = Arc::new(ReentrantTransport {
        coordinator: Mutex::new(None),
        nested: Mutex::new(None),
    });
    let coordinator = Arc::new(coordinator(store, transport.clone()));
    *transport.coordinator.lock().unwrap() = Some(coordinator.clone());

    assert_eq!(coordinator.upload(SERVER, "device-1").unwrap(), UploadResult::Success(2));
    let nested = transport.nested.lock().unwrap().take().unwrap();
    assert!(matches!(nested, Err(UploadError::InFlight)));
    assert_eq!(coordinator.upload(SERVER, "device-1").unwrap(), UploadResult::Empty);
    transport.coordinator.lock().unwrap().take();
}

#[test]
fn events_trace_a_successful_upload() {
    let events = Arc::new(MemoryEventSink::new());
    let coordinator = UploadCoordinator::new(
        seeded_store(),
        ScriptedTransport::new(Reply::Status(200)),
        events.clone(),
        UtcOffset::UTC,
    );
    coordinator.upload(SERVER, "device-1").unwrap();

    let recorded = events.events();
    assert_eq!(recorded.len(), 2);
    assert!(matches!(recorded[0].kind, AgentEventKind::UploadStarted { fixes: 2, .. }));
    assert!(matches!(
        recorded[1].kind,
        AgentEventKind::UploadFinished {
            outcome: "success",
            fixes: 2,
            status: Some(200),
            ..
        }
    ));
}

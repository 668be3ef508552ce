// crates/fixtrail-core/src/runtime/events.rs
// ============================================================================
// Module: fixtrail Agent Events
// Description: Structured events for sampling and upload activity.
// Purpose: Emit JSON-line records without hard logging dependencies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The runtime reports what it does through an [`EventSink`]. Events are
//! plain serializable records; sinks decide where they go (stderr, an
//! append-only file, memory for tests, or nowhere). Recording never fails the
//! caller: sink write errors are swallowed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use serde::Serialize;

use crate::model::Timestamp;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEventKind {
    /// A sampling session started.
    SamplingStarted {
        /// Target interval in milliseconds.
        interval_ms: u64,
        /// Minimum interval between accepted fixes in milliseconds.
        fastest_interval_ms: u64,
    },
    /// A sampling session stopped.
    SamplingStopped {
        /// Fixes appended to the store.
        recorded: u64,
        /// Fixes the store refused.
        dropped: u64,
        /// Fixes discarded by the cadence gate.
        throttled: u64,
    },
    /// A fix was durably appended.
    FixRecorded {
        /// Store-assigned identifier.
        fix_id: i64,
        /// Capture time in unix milliseconds.
        captured_at_ms: i64,
    },
    /// A fix could not be appended and was dropped.
    FixDropped {
        /// Capture time in unix milliseconds.
        captured_at_ms: i64,
        /// Failure description.
        reason: String,
    },
    /// A fix arrived sooner than the fastest interval and was discarded.
    FixThrottled {
        /// Capture time in unix milliseconds.
        captured_at_ms: i64,
    },
    /// The sampler reported an error.
    SamplerError {
        /// Failure description.
        message: String,
        /// Whether sampling continues.
        recoverable: bool,
    },
    /// An upload attempt is about to POST a batch.
    UploadStarted {
        /// Submission endpoint.
        endpoint: String,
        /// Fixes in the batch.
        fixes: usize,
    },
    /// An upload attempt finished.
    UploadFinished {
        /// Outcome label.
        outcome: &'static str,
        /// Fixes in the batch.
        fixes: usize,
        /// HTTP status when one was received.
        status: Option<u16>,
        /// Failure description when applicable.
        message: Option<String>,
    },
}

/// Timestamped agent event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentEvent {
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: i64,
    /// Event payload.
    #[serde(flatten)]
    pub kind: AgentEventKind,
}

impl AgentEvent {
    /// Creates an event stamped with the current time.
    #[must_use]
    pub fn now(kind: AgentEventKind) -> Self {
        Self {
            timestamp_ms: Timestamp::now().as_unix_millis(),
            kind,
        }
    }
}

// ============================================================================
// SECTION: Trait
// ============================================================================

/// Destination for agent events.
pub trait EventSink: Send + Sync {
    /// Records an event.
    fn record(&self, event: &AgentEvent);
}

/// Event sink that discards everything.
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn record(&self, _event: &AgentEvent) {}
}

/// Event sink that logs JSON lines to stderr.
pub struct StderrEventSink;

impl EventSink for StderrEventSink {
    fn record(&self, event: &AgentEvent) {
        if let Ok(payload) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Event sink that logs JSON lines to a file.
pub struct FileEventSink {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileEventSink {
    /// Opens the event log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl EventSink for FileEventSink {
    fn record(&self, event: &AgentEvent) {
        let Ok(payload) = serde_json::to_string(event) else {
            return;
        };
        if let Ok(mut guard) = self.file.lock() {
            let _ = writeln!(&mut *guard, "{payload}");
        }
    }
}

/// Event sink that keeps events in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    /// Recorded events in arrival order.
    events: Mutex<Vec<AgentEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty memory sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the recorded events.
    #[must_use]
    pub fn events(&self) -> Vec<AgentEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }
}

impl EventSink for MemoryEventSink {
    fn record(&self, event: &AgentEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event.clone());
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

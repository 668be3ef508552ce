// crates/fixtrail-core/src/runtime/sampling.rs
// ============================================================================
// Module: fixtrail Sampling Session
// Description: Feeds sampler output into a sample store.
// Purpose: Persist every admitted fix as it arrives, independent of uploads.
// Dependencies: crate::{model, interfaces}, tokio
// ============================================================================

//! ## Overview
//! A [`SamplingSession`] pulls fixes from a [`Sampler`] on a dedicated thread,
//! filters them through a [`CadenceGate`], and hands them over a bounded
//! channel to an async task that appends each one to the store. A failed
//! append drops that fix and sampling continues.
//!
//! Stopping is cooperative: after [`SamplingSession::stop`] returns, no fix
//! is appended anymore. Fixes already queued are persisted before the report
//! is produced. A sampler blocked in `next_fix` exits on its next delivery.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::interfaces::SampleStore;
use crate::interfaces::Sampler;
use crate::model::Fix;
use crate::runtime::events::AgentEvent;
use crate::runtime::events::AgentEventKind;
use crate::runtime::events::EventSink;
use crate::runtime::sampler::CadenceGate;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Fixes buffered between the sampler thread and the store task.
const FIX_QUEUE_DEPTH: usize = 64;

// ============================================================================
// SECTION: Report
// ============================================================================

/// Counters describing one sampling session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SamplingReport {
    /// Fixes appended to the store.
    pub recorded: u64,
    /// Fixes the store refused.
    pub dropped: u64,
    /// Fixes discarded by the cadence gate.
    pub throttled: u64,
}

/// Shared session counters.
#[derive(Debug, Default)]
struct Counters {
    /// Fixes appended to the store.
    recorded: AtomicU64,
    /// Fixes the store refused.
    dropped: AtomicU64,
    /// Fixes discarded by the cadence gate.
    throttled: AtomicU64,
}

impl Counters {
    /// Snapshots the counters.
    fn report(&self) -> SamplingReport {
        SamplingReport {
            recorded: self.recorded.load(Ordering::Acquire),
            dropped: self.dropped.load(Ordering::Acquire),
            throttled: self.throttled.load(Ordering::Acquire),
        }
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

/// Running sampling session.
pub struct SamplingSession {
    /// Asks the sampler thread to stop polling.
    stop_flag: Arc<AtomicBool>,
    /// Asks the store task to stop after draining queued fixes.
    stop_tx: Option<oneshot::Sender<()>>,
    /// Store task handle.
    consumer: JoinHandle<()>,
    /// Session counters.
    counters: Arc<Counters>,
    /// Event destination.
    events: Arc<dyn EventSink>,
}

impl SamplingSession {
    /// Starts sampling into `store`. Must be called from within a Tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when the sampler thread cannot be spawned.
    pub fn start<S>(
        sampler: S,
        store: Arc<dyn SampleStore>,
        events: Arc<dyn EventSink>,
    ) -> io::Result<Self>
    where
        S: Sampler + 'static,
    {
        let cadence = sampler.cadence();
        let (tx, rx) = mpsc::channel(FIX_QUEUE_DEPTH);
        let (stop_tx, stop_rx) = oneshot::channel();
        let stop_flag = Arc::new(AtomicBool::new(false));
        let counters = Arc::new(Counters::default());

        let producer = Producer {
            gate: CadenceGate::new(cadence),
            tx,
            stop_flag: Arc::clone(&stop_flag),
            counters: Arc::clone(&counters),
            events: Arc::clone(&events),
        };
        thread::Builder::new()
            .name("fixtrail-sampler".to_string())
            .spawn(move || producer.run(sampler))?;

        events.record(&AgentEvent::now(AgentEventKind::SamplingStarted {
            interval_ms: cadence.interval_ms,
            fastest_interval_ms: cadence.fastest_interval_ms,
        }));
        let consumer = tokio::spawn(consume(
            rx,
            stop_rx,
            store,
            Arc::clone(&counters),
            Arc::clone(&events),
        ));
        Ok(Self {
            stop_flag,
            stop_tx: Some(stop_tx),
            consumer,
            counters,
            events,
        })
    }

    /// Returns the counters observed so far.
    #[must_use]
    pub fn snapshot(&self) -> SamplingReport {
        self.counters.report()
    }

    /// Stops sampling and waits for queued fixes to be persisted.
    pub async fn stop(mut self) -> SamplingReport {
        self.request_stop();
        self.finish().await
    }

    /// Waits until the sampler is exhausted and every fix is persisted.
    pub async fn finished(self) -> SamplingReport {
        self.finish().await
    }

    /// Runs until the sampler is exhausted or `shutdown` resolves. On
    /// shutdown the session stops as with [`SamplingSession::stop`].
    pub async fn run_until<F>(mut self, shutdown: F) -> SamplingReport
    where
        F: Future<Output = ()>,
    {
        let exhausted = tokio::select! {
            _ = &mut self.consumer => true,
            () = shutdown => false,
        };
        if exhausted {
            return self.stopped();
        }
        self.request_stop();
        self.finish().await
    }

    /// Signals both sides of the pipeline to stop.
    fn request_stop(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
    }

    /// Joins the store task and emits the stop event.
    async fn finish(mut self) -> SamplingReport {
        // A panicked store task leaves the counters at their last values.
        let _ = (&mut self.consumer).await;
        self.stopped()
    }

    /// Marks the session stopped and emits the stop event.
    fn stopped(&self) -> SamplingReport {
        self.stop_flag.store(true, Ordering::Release);
        let report = self.counters.report();
        self.events.record(&AgentEvent::now(AgentEventKind::SamplingStopped {
            recorded: report.recorded,
            dropped: report.dropped,
            throttled: report.throttled,
        }));
        report
    }
}

// ============================================================================
// SECTION: Producer
// ============================================================================

/// Sampler-side state moved onto the sampler thread.
struct Producer {
    /// Fastest-interval filter.
    gate: CadenceGate,
    /// Queue into the store task.
    tx: mpsc::Sender<Fix>,
    /// Set when the session stops.
    stop_flag: Arc<AtomicBool>,
    /// Session counters.
    counters: Arc<Counters>,
    /// Event destination.
    events: Arc<dyn EventSink>,
}

impl Producer {
    /// Polls the sampler until it is exhausted, fails hard, or the session
    /// stops.
    fn run<S: Sampler>(mut self, mut sampler: S) {
        while !self.stop_flag.load(Ordering::Acquire) {
            match sampler.next_fix() {
                Ok(Some(fix)) => {
                    if !self.gate.admit(&fix) {
                        self.counters.throttled.fetch_add(1, Ordering::AcqRel);
                        self.events.record(&AgentEvent::now(AgentEventKind::FixThrottled {
                            captured_at_ms: fix.captured_at.as_unix_millis(),
                        }));
                        continue;
                    }
                    if self.tx.blocking_send(fix).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    let recoverable = err.is_recoverable();
                    self.events.record(&AgentEvent::now(AgentEventKind::SamplerError {
                        message: err.to_string(),
                        recoverable,
                    }));
                    if !recoverable {
                        break;
                    }
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Consumer
// ============================================================================

/// Appends queued fixes until the producer ends or a stop is requested, then
/// drains whatever is still queued.
async fn consume(
    mut rx: mpsc::Receiver<Fix>,
    mut stop_rx: oneshot::Receiver<()>,
    store: Arc<dyn SampleStore>,
    counters: Arc<Counters>,
    events: Arc<dyn EventSink>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            received = rx.recv() => match received {
                Some(fix) => persist(&store, fix, &counters, events.as_ref()).await,
                None => return,
            },
        }
    }
    rx.close();
    while let Some(fix) = rx.recv().await {
        persist(&store, fix, &counters, events.as_ref()).await;
    }
}

/// Appends one fix off the async executor and records the outcome.
async fn persist(
    store: &Arc<dyn SampleStore>,
    fix: Fix,
    counters: &Counters,
    events: &dyn EventSink,
) {
    let store = Arc::clone(store);
    let outcome = tokio::task::spawn_blocking(move || store.append(&fix))
        .await
        .map_err(|err| err.to_string())
        .and_then(|result| result.map_err(|err| err.to_string()));
    let captured_at_ms = fix.captured_at.as_unix_millis();
    match outcome {
        Ok(id) => {
            counters.recorded.fetch_add(1, Ordering::AcqRel);
            events.record(&AgentEvent::now(AgentEventKind::FixRecorded {
                fix_id: id.get(),
                captured_at_ms,
            }));
        }
        Err(reason) => {
            counters.dropped.fetch_add(1, Ordering::AcqRel);
            events.record(&AgentEvent::now(AgentEventKind::FixDropped {
                captured_at_ms,
                reason,
            }));
        }
    }
}

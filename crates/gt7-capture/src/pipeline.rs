//! Hands completed laps from the capture loop to a single persistence worker.
//!
//! The queue is an unbounded FIFO with one producer ([`LapSubmitter`]) and one
//! consumer (the worker thread), so laps reach the sink in the order they were
//! completed and never concurrently. The worker blocks on the queue, projects
//! each lap under the configured [`ExportMode`] and passes it to the sink.
//!
//! A sink error is final. The worker logs it, raises its failure signal and
//! returns without touching the rest of the queue. Dropping the submitter
//! closes the queue; the worker then drains what is left and exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, Sender};
use gt7_protocol::ExportMode;
use tracing::{debug, error, info};

use crate::error::CaptureError;
use crate::segmenter::LapBatch;
use crate::signal::{FailureTrigger, FailureWatch, WorkerKind, failure_signal};
use crate::sink::{Delivery, LapRecord, LapSink};
use crate::worker::{JoinOutcome, WorkerHandle};

/// A lap the sink accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedLap {
    pub lap_id: String,
    pub samples: usize,
    pub delivery: Delivery,
}

type PersistedHook = Box<dyn FnMut(&PersistedLap) + Send>;

/// The worker's queue was closed because the worker has stopped.
#[derive(Debug, thiserror::Error)]
#[error("persistence worker is no longer accepting laps")]
pub struct QueueClosed(pub LapBatch);

/// Producer half of the lap queue. Owned by the capture loop.
#[derive(Debug)]
pub struct LapSubmitter {
    tx: Sender<LapBatch>,
}

impl LapSubmitter {
    /// Enqueue a lap without blocking.
    pub fn submit(&self, batch: LapBatch) -> Result<(), QueueClosed> {
        self.tx.send(batch).map_err(|e| QueueClosed(e.into_inner()))
    }

    /// Laps waiting for the worker.
    pub fn queued(&self) -> usize {
        self.tx.len()
    }
}

/// Handle to the running persistence worker.
#[derive(Debug)]
pub struct PersistenceWorker {
    handle: WorkerHandle,
    watch: FailureWatch,
    persisted: Arc<AtomicU64>,
}

impl PersistenceWorker {
    pub fn failure_watch(&self) -> FailureWatch {
        self.watch.clone()
    }

    /// Laps the sink has accepted so far.
    pub fn laps_persisted(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to drain and exit, up to `timeout`. Drop the
    /// [`LapSubmitter`] first or the worker never sees the end of the queue.
    pub fn join(self, timeout: Duration) -> JoinOutcome {
        let outcome = self.handle.join_timeout(timeout);
        debug!(
            laps_persisted = self.persisted.load(Ordering::Relaxed),
            ?outcome,
            "persistence worker joined"
        );
        outcome
    }
}

/// Builder for the persistence pipeline.
pub struct PersistencePipeline<S> {
    sink: S,
    mode: ExportMode,
    on_persisted: Option<PersistedHook>,
}

impl<S: LapSink + 'static> PersistencePipeline<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            mode: ExportMode::default(),
            on_persisted: None,
        }
    }

    pub fn mode(mut self, mode: ExportMode) -> Self {
        self.mode = mode;
        self
    }

    /// Called on the worker thread after each lap the sink accepts.
    pub fn on_persisted(mut self, hook: impl FnMut(&PersistedLap) + Send + 'static) -> Self {
        self.on_persisted = Some(Box::new(hook));
        self
    }

    /// Start the worker.
    pub fn spawn(self) -> Result<(LapSubmitter, PersistenceWorker), CaptureError> {
        let (tx, rx) = channel::unbounded();
        let (trigger, watch) = failure_signal(WorkerKind::Persistence);
        let persisted = Arc::new(AtomicU64::new(0));

        let state = WorkerState {
            rx,
            sink: self.sink,
            mode: self.mode,
            on_persisted: self.on_persisted,
            trigger: trigger.clone(),
            persisted: Arc::clone(&persisted),
        };
        let handle = WorkerHandle::spawn(trigger, move || state.run()).map_err(
            |source| CaptureError::Spawn {
                kind: WorkerKind::Persistence,
                source,
            },
        )?;

        Ok((
            LapSubmitter { tx },
            PersistenceWorker {
                handle,
                watch,
                persisted,
            },
        ))
    }
}

struct WorkerState<S> {
    rx: Receiver<LapBatch>,
    sink: S,
    mode: ExportMode,
    on_persisted: Option<PersistedHook>,
    trigger: FailureTrigger,
    persisted: Arc<AtomicU64>,
}

impl<S: LapSink> WorkerState<S> {
    fn run(mut self) {
        // Yields queued laps until the submitter is dropped and the queue is empty.
        while let Ok(batch) = self.rx.recv() {
            let record = LapRecord::from_batch(&batch, self.mode);
            match self.sink.persist(&record) {
                Ok(delivery) => {
                    self.persisted.fetch_add(1, Ordering::Relaxed);
                    info!(lap = %record.lap_id, samples = record.points.len(), %delivery, "lap persisted");
                    if let Some(hook) = self.on_persisted.as_mut() {
                        hook(&PersistedLap {
                            lap_id: record.lap_id,
                            samples: record.points.len(),
                            delivery,
                        });
                    }
                }
                Err(e) => {
                    error!(lap = %record.lap_id, error = %e, "failed to persist lap; stopping");
                    self.trigger.raise();
                    return;
                }
            }
        }
        debug!("lap queue closed");
    }
}

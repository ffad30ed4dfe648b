//! Background worker that keeps the backend session alive.
//!
//! The first heartbeat goes out as soon as the worker starts, then one per
//! interval. Any failure raises the worker's failure signal and ends the
//! worker; it never retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use gt7_capture::{
    CaptureError, FailureTrigger, FailureWatch, JoinOutcome, WorkerHandle, WorkerKind,
    failure_signal,
};
use tracing::{debug, error};

use crate::client::BackendClient;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Handle to the running heartbeat worker.
#[derive(Debug)]
pub struct SessionHeartbeat {
    handle: WorkerHandle,
    watch: FailureWatch,
    stop_tx: Sender<()>,
    beats: Arc<AtomicU64>,
}

impl SessionHeartbeat {
    pub fn spawn(client: BackendClient, interval: Duration) -> Result<Self, CaptureError> {
        let (trigger, watch) = failure_signal(WorkerKind::SessionHeartbeat);
        let (stop_tx, stop_rx) = channel::bounded(1);
        let beats = Arc::new(AtomicU64::new(0));

        let worker_beats = Arc::clone(&beats);
        let handle = WorkerHandle::spawn(trigger.clone(), move || {
            run(&client, interval, &stop_rx, &trigger, &worker_beats);
        })
        .map_err(|source| CaptureError::Spawn {
            kind: WorkerKind::SessionHeartbeat,
            source,
        })?;

        Ok(Self {
            handle,
            watch,
            stop_tx,
            beats,
        })
    }

    pub fn failure_watch(&self) -> FailureWatch {
        self.watch.clone()
    }

    /// Heartbeats the backend has acknowledged.
    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the worker to stop and wait up to `timeout` for it. A heartbeat
    /// already in flight is bounded by the client's request timeout.
    pub fn stop(self, timeout: Duration) -> JoinOutcome {
        drop(self.stop_tx);
        self.handle.join_timeout(timeout)
    }
}

fn run(
    client: &BackendClient,
    interval: Duration,
    stop_rx: &Receiver<()>,
    trigger: &FailureTrigger,
    beats: &AtomicU64,
) {
    loop {
        if let Err(e) = client.heartbeat() {
            error!(error = %e, "session heartbeat failed");
            trigger.raise();
            return;
        }
        beats.fetch_add(1, Ordering::Relaxed);

        match stop_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                debug!("session heartbeat stopped");
                return;
            }
        }
    }
}

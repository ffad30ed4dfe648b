//! Named background threads with a bounded join.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::signal::{FailureTrigger, WorkerKind};

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a bounded join ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The thread returned within the timeout.
    Finished,
    /// The thread panicked.
    Panicked,
    /// The thread was still running at the deadline and has been detached.
    Detached,
}

/// A running background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    kind: WorkerKind,
    handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Spawn `body` on a thread named after the trigger's worker kind.
    ///
    /// A panic in `body` raises `trigger` before the thread unwinds, so the
    /// capture loop sees a dead worker the same way it sees a failed one.
    pub fn spawn<F>(trigger: FailureTrigger, body: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let kind = trigger.kind();
        let handle = thread::Builder::new()
            .name(kind.thread_name().to_owned())
            .spawn(move || {
                if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(body)) {
                    error!(worker = %kind, "worker panicked; raising failure signal");
                    trigger.raise();
                    panic::resume_unwind(payload);
                }
            })?;
        debug!(worker = %kind, "worker started");
        Ok(Self { kind, handle })
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait up to `timeout` for the thread to return.
    ///
    /// A thread that is still running at the deadline is detached: its handle
    /// is dropped and it keeps running until the process exits.
    pub fn join_timeout(self, timeout: Duration) -> JoinOutcome {
        let deadline = Instant::now() + timeout;
        while !self.handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(worker = %self.kind, ?timeout, "worker did not stop in time; detaching");
                return JoinOutcome::Detached;
            }
            thread::sleep(JOIN_POLL_INTERVAL);
        }
        match self.handle.join() {
            Ok(()) => {
                debug!(worker = %self.kind, "worker stopped");
                JoinOutcome::Finished
            }
            Err(_) => {
                error!(worker = %self.kind, "worker panicked");
                JoinOutcome::Panicked
            }
        }
    }
}

//! One-way failure flags raised by background workers.
//!
//! Each worker owns the [`FailureTrigger`] half; the capture loop polls the
//! [`FailureWatch`] half once per iteration. A raised flag is never lowered.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which background worker a signal belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerKind {
    /// Writes or uploads completed laps.
    Persistence,
    /// Keeps the remote backend session alive.
    SessionHeartbeat,
}

impl WorkerKind {
    pub fn thread_name(self) -> &'static str {
        match self {
            Self::Persistence => "gt7-persistence",
            Self::SessionHeartbeat => "gt7-session-heartbeat",
        }
    }
}

impl fmt::Display for WorkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Persistence => "persistence",
            Self::SessionHeartbeat => "session heartbeat",
        })
    }
}

/// Create a fresh, unraised signal for `kind`.
pub fn failure_signal(kind: WorkerKind) -> (FailureTrigger, FailureWatch) {
    let flag = Arc::new(AtomicBool::new(false));
    (
        FailureTrigger {
            kind,
            flag: Arc::clone(&flag),
        },
        FailureWatch { kind, flag },
    )
}

/// Writer half, held by the worker.
#[derive(Debug, Clone)]
pub struct FailureTrigger {
    kind: WorkerKind,
    flag: Arc<AtomicBool>,
}

impl FailureTrigger {
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }
}

/// Reader half, polled by the capture loop.
#[derive(Debug, Clone)]
pub struct FailureWatch {
    kind: WorkerKind,
    flag: Arc<AtomicBool>,
}

impl FailureWatch {
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    pub fn kind(&self) -> WorkerKind {
        self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn starts_lowered() {
        let (_trigger, watch) = failure_signal(WorkerKind::Persistence);
        assert!(!watch.is_raised());
        assert_eq!(watch.kind(), WorkerKind::Persistence);
    }

    #[test]
    fn raise_is_visible_across_threads() -> Result<(), Box<dyn std::error::Error>> {
        let (trigger, watch) = failure_signal(WorkerKind::SessionHeartbeat);
        thread::spawn(move || trigger.raise())
            .join()
            .map_err(|_| "raising thread panicked")?;
        assert!(watch.is_raised());
        Ok(())
    }

    #[test]
    fn raising_twice_stays_raised() {
        let (trigger, watch) = failure_signal(WorkerKind::Persistence);
        trigger.raise();
        trigger.raise();
        assert!(watch.is_raised());
        assert!(watch.clone().is_raised());
    }

    #[test]
    fn kinds_have_distinct_names() {
        assert_eq!(WorkerKind::Persistence.to_string(), "persistence");
        assert_eq!(WorkerKind::SessionHeartbeat.to_string(), "session heartbeat");
        assert_ne!(
            WorkerKind::Persistence.thread_name(),
            WorkerKind::SessionHeartbeat.thread_name()
        );
    }
}

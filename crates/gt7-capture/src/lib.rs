//! Capture side of the GT7 telemetry agent.
//!
//! ```text
//! console ──udp──▶ CaptureLoop ──▶ decrypt/decode ──▶ LapSegmenter
//!    ▲                 │                                   │ LapBatch
//!    └── keepalive ◀───┘                                   ▼
//!                                   LapSubmitter ──queue──▶ persistence worker ──▶ LapSink
//! ```
//!
//! The capture loop runs on the caller's thread and owns the receive socket
//! and segmenter state. Completed laps cross to the persistence worker over a
//! FIFO queue; the worker reports failure back only through its
//! [`FailureWatch`], which the loop polls every iteration.

#![deny(clippy::unwrap_used)]

pub mod capture;
pub mod error;
pub mod keepalive;
pub mod pipeline;
pub mod segmenter;
pub mod signal;
pub mod sink;
pub mod worker;

pub use capture::{CaptureConfig, CaptureLoop, CaptureSockets, CaptureStats, Step, StopReason};
pub use error::{CaptureError, KeepaliveError};
pub use keepalive::{KeepaliveSender, send_keepalive};
pub use pipeline::{LapSubmitter, PersistedLap, PersistencePipeline, PersistenceWorker};
pub use segmenter::{LapBatch, LapSegmenter};
pub use signal::{FailureTrigger, FailureWatch, WorkerKind, failure_signal};
pub use sink::{Delivery, LapRecord, LapSink, LocalFileSink, SinkError};
pub use worker::{JoinOutcome, WorkerHandle};

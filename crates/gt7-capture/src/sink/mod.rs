//! Persistence destinations for completed laps.

mod local;

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use gt7_protocol::{ExportMode, LapPoints, LapTime};
use serde::Serialize;

use crate::segmenter::LapBatch;

pub use local::{DEFAULT_OUTPUT_DIR, LocalFileSink};

/// A completed lap, projected and named, ready to be handed to a sink.
///
/// Serializes as the remote upload payload `{"lap_id": ..., "data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LapRecord {
    pub lap_id: String,
    #[serde(skip)]
    pub duration: LapTime,
    #[serde(rename = "data")]
    pub points: LapPoints,
}

impl LapRecord {
    pub fn from_batch(batch: &LapBatch, mode: ExportMode) -> Self {
        Self {
            lap_id: batch.lap_id(),
            duration: batch.duration,
            points: LapPoints::project(&batch.samples, mode),
        }
    }
}

/// Where a lap ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Written { path: PathBuf },
    Uploaded { endpoint: String },
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Written { path } => write!(f, "saved to {}", path.display()),
            Self::Uploaded { endpoint } => write!(f, "uploaded to {endpoint}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("failed to create lap directory {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write lap file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize lap {lap_id}")]
    Serialize {
        lap_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to upload lap {lap_id}")]
    Upload {
        lap_id: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// A persistence destination. Called from the persistence worker only, one
/// lap at a time.
///
/// Any error is final: the worker stops and raises its failure signal.
pub trait LapSink: Send {
    fn persist(&mut self, lap: &LapRecord) -> Result<Delivery, SinkError>;
}

impl<S: LapSink + ?Sized> LapSink for Box<S> {
    fn persist(&mut self, lap: &LapRecord) -> Result<Delivery, SinkError> {
        (**self).persist(lap)
    }
}

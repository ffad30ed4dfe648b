use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Delivery, LapRecord, LapSink, SinkError};

/// Directory laps are written to when none is configured.
pub const DEFAULT_OUTPUT_DIR: &str = "laps";

/// Writes each lap as a pretty-printed JSON array to `<dir>/<lap_id>`.
///
/// The directory is created on first use. A lap with the same formatted
/// duration as an earlier one replaces its file.
#[derive(Debug, Clone)]
pub struct LocalFileSink {
    dir: PathBuf,
}

impl LocalFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Default for LocalFileSink {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_DIR)
    }
}

impl LapSink for LocalFileSink {
    fn persist(&mut self, lap: &LapRecord) -> Result<Delivery, SinkError> {
        fs::create_dir_all(&self.dir).map_err(|source| SinkError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(&lap.lap_id);
        let write_err = |source: std::io::Error| SinkError::Write {
            path: path.clone(),
            source,
        };

        let file = File::create(&path).map_err(write_err)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &lap.points).map_err(|source| {
            SinkError::Serialize {
                lap_id: lap.lap_id.clone(),
                source,
            }
        })?;
        writer.flush().map_err(write_err)?;

        debug!(path = %path.display(), samples = lap.points.len(), "lap written");
        Ok(Delivery::Written { path })
    }
}

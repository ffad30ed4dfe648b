//! Splits the sample stream into completed laps.
//!
//! A lap is closed when the reported lap index increases. The batch that
//! closes carries the console's own `last_lap` time from the sample that
//! triggered the close.
//!
//! Recording starts at the first increase of the lap index and every later
//! increase emits the lap just finished. Samples seen before the first
//! increase (lap 0, or a lap already in progress when the agent started) are
//! never emitted, since that lap's start was not observed. A step from 0 to 1
//! after a return to the pits restarts recording the same way.
//!
//! A lap index that decreases or resets without going through 0 (leaving a
//! race and starting another) is treated as a continuation of the current
//! lap; samples keep accumulating until the index next increases.

use gt7_protocol::{LapTime, TelemetrySample};

/// All samples of one completed lap.
#[derive(Debug, Clone, PartialEq)]
pub struct LapBatch {
    pub samples: Vec<TelemetrySample>,
    pub duration: LapTime,
}

impl LapBatch {
    pub fn lap_id(&self) -> String {
        self.duration.lap_id()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct LapSegmenter {
    last_lap: Option<i16>,
    recording: bool,
    buffer: Vec<TelemetrySample>,
}

impl LapSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one unpaused sample. Returns the lap it completed, if any.
    pub fn push(&mut self, sample: TelemetrySample) -> Option<LapBatch> {
        let current = sample.current_lap;
        let mut completed = None;

        if let Some(last) = self.last_lap
            && current != 0
            && current > last
        {
            if !self.recording || last == 0 {
                self.recording = true;
                self.last_lap = Some(current);
                self.buffer.clear();
                self.buffer.push(sample);
                return None;
            }
            completed = Some(LapBatch {
                samples: std::mem::take(&mut self.buffer),
                duration: LapTime::from_reported(sample.last_lap_ms),
            });
        }

        self.last_lap = Some(current);
        self.buffer.push(sample);
        completed
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Lap index of the most recent sample.
    pub fn current_lap(&self) -> Option<i16> {
        self.last_lap
    }

    /// Samples buffered for the lap in progress.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt7_test_helpers::{lap_stream, must_some};

    fn run(laps: &[i16]) -> Vec<LapBatch> {
        let mut seg = LapSegmenter::new();
        lap_stream(laps)
            .into_iter()
            .filter_map(|s| seg.push(s))
            .collect()
    }

    fn ids(batch: &LapBatch) -> Vec<i32> {
        batch.samples.iter().map(|s| s.package_id).collect()
    }

    #[test]
    fn emits_each_lap_after_the_first_increase() {
        let batches = run(&[0, 0, 1, 1, 1, 2, 2, 3]);
        assert_eq!(batches.len(), 2);
        assert_eq!(ids(&batches[0]), [2, 3, 4]);
        assert_eq!(ids(&batches[1]), [5, 6]);
    }

    #[test]
    fn batch_takes_last_lap_of_triggering_sample() {
        let batches = run(&[0, 1, 1, 2, 3]);
        assert_eq!(batches[0].duration, LapTime::from_millis(61_000));
        assert_eq!(batches[0].lap_id(), "lap_01-01-000.json");
        assert_eq!(batches[1].duration, LapTime::from_millis(62_000));
    }

    #[test]
    fn joining_mid_race_skips_the_lap_in_progress() {
        let batches = run(&[3, 3, 4, 4, 5]);
        assert_eq!(batches.len(), 1);
        assert_eq!(ids(&batches[0]), [2, 3]);
    }

    #[test]
    fn no_increase_no_batch() {
        assert!(run(&[0, 0, 0, 0]).is_empty());
        assert!(run(&[2, 2, 2]).is_empty());
    }

    #[test]
    fn first_increase_only_starts_recording() {
        let mut seg = LapSegmenter::new();
        let stream = lap_stream(&[1, 2]);
        assert!(seg.push(stream[0].clone()).is_none());
        assert!(!seg.is_recording());
        assert!(seg.push(stream[1].clone()).is_none());
        assert!(seg.is_recording());
        assert_eq!(seg.pending(), 1);
        assert_eq!(seg.current_lap(), Some(2));
    }

    #[test]
    fn return_to_zero_restarts_without_emitting() {
        // 0 -> 1 after being back in the pits starts a fresh recording.
        let batches = run(&[0, 1, 2, 0, 0, 1, 1, 2]);
        assert_eq!(batches.len(), 2);
        assert_eq!(ids(&batches[0]), [1]);
        assert_eq!(ids(&batches[1]), [5, 6]);
    }

    #[test]
    fn decreasing_index_keeps_accumulating() {
        let batches = run(&[0, 1, 1, 3, 2, 2, 3]);
        assert_eq!(batches.len(), 2);
        assert_eq!(ids(&batches[0]), [1, 2]);
        assert_eq!(ids(&batches[1]), [3, 4, 5]);
    }

    #[test]
    fn skipped_index_still_closes_lap() {
        let batches = run(&[0, 1, 1, 3]);
        let batch = must_some(batches.first(), "expected one batch");
        assert_eq!(ids(batch), [1, 2]);
    }

    #[test]
    fn emitted_batches_are_never_empty() {
        for laps in [
            &[0, 1, 2, 3, 4][..],
            &[1, 2, 3, 4],
            &[0, 0, 1, 2, 2, 3],
        ] {
            for batch in run(laps) {
                assert!(!batch.is_empty(), "empty batch from {laps:?}");
            }
        }
    }
}

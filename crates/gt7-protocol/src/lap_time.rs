//! Lap durations as the console reports them.

use std::fmt;

/// Duration of a completed lap in milliseconds.
///
/// Displays as `MM-SS-mmm`, which is also the stem of a persisted lap's
/// identifier. Minutes are not capped at 59.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct LapTime(u32);

impl LapTime {
    pub const fn from_millis(ms: u32) -> Self {
        Self(ms)
    }

    /// From the signed `last_lap` field. The console sends `-1` before any
    /// lap has been completed; negative values clamp to zero.
    pub fn from_reported(ms: i32) -> Self {
        Self(u32::try_from(ms).unwrap_or(0))
    }

    pub const fn as_millis(self) -> u32 {
        self.0
    }

    pub fn minutes(self) -> u32 {
        self.0 / 60_000
    }

    pub fn seconds(self) -> u32 {
        self.0 / 1000 % 60
    }

    pub fn millis(self) -> u32 {
        self.0 % 1000
    }

    /// Identifier of a persisted lap, e.g. `lap_01-01-000.json`.
    pub fn lap_id(self) -> String {
        format!("lap_{self}.json")
    }
}

impl fmt::Display for LapTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}-{:02}-{:03}",
            self.minutes(),
            self.seconds(),
            self.millis()
        )
    }
}

//! Per-sample JSON projections used when a lap is persisted.

use serde::{Deserialize, Serialize};

use crate::sample::TelemetrySample;

/// Which fields of each sample end up in a persisted lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportMode {
    /// Driver inputs, speed and position.
    #[default]
    Telemetry,
    /// Position only; enough to draw the racing line.
    Track,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryPoint {
    pub package_id: i32,
    pub current_gear: u8,
    pub car_speed: f64,
    pub throttle: f64,
    pub brake: f64,
    pub position_x: f32,
    pub position_y: f32,
    pub position_z: f32,
}

impl From<&TelemetrySample> for TelemetryPoint {
    fn from(s: &TelemetrySample) -> Self {
        Self {
            package_id: s.package_id,
            current_gear: s.current_gear,
            car_speed: s.car_speed,
            throttle: s.throttle,
            brake: s.brake,
            position_x: s.position.x,
            position_y: s.position.y,
            position_z: s.position.z,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    pub position_x: f32,
    pub position_y: f32,
    pub position_z: f32,
}

impl From<&TelemetrySample> for TrackPoint {
    fn from(s: &TelemetrySample) -> Self {
        Self {
            position_x: s.position.x,
            position_y: s.position.y,
            position_z: s.position.z,
        }
    }
}

/// A whole lap projected under one [`ExportMode`]. Serializes as a bare
/// JSON array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LapPoints {
    Telemetry(Vec<TelemetryPoint>),
    Track(Vec<TrackPoint>),
}

impl LapPoints {
    pub fn project(samples: &[TelemetrySample], mode: ExportMode) -> Self {
        match mode {
            ExportMode::Telemetry => Self::Telemetry(samples.iter().map(Into::into).collect()),
            ExportMode::Track => Self::Track(samples.iter().map(Into::into).collect()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Telemetry(points) => points.len(),
            Self::Track(points) => points.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn mode(&self) -> ExportMode {
        match self {
            Self::Telemetry(_) => ExportMode::Telemetry,
            Self::Track(_) => ExportMode::Track,
        }
    }
}

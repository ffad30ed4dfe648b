//! Fixed-offset decoding of a decrypted packet into a [`TelemetrySample`].

use std::time::Duration;

use serde::Serialize;

use crate::PACKET_SIZE;
use crate::record::DecryptedRecord;
use crate::wire::{read_f32, read_i16, read_i32, read_u8, read_u16};

// ---------------------------------------------------------------------------
// Packet field offsets (all values are little-endian)
// ---------------------------------------------------------------------------
const OFF_POSITION: usize = 0x04; // 3x f32
const OFF_VELOCITY: usize = 0x10; // 3x f32
const OFF_ROTATION: usize = 0x1C; // 3x f32: pitch, yaw, roll
const OFF_ANGULAR_VELOCITY: usize = 0x2C; // 3x f32
const OFF_RIDE_HEIGHT: usize = 0x38; // f32, metres
const OFF_ENGINE_RPM: usize = 0x3C; // f32
const OFF_FUEL_LEVEL: usize = 0x44; // f32
const OFF_FUEL_CAPACITY: usize = 0x48; // f32
const OFF_SPEED: usize = 0x4C; // f32, m/s
const OFF_BOOST: usize = 0x50; // f32, 1.0 = atmospheric
const OFF_OIL_PRESSURE: usize = 0x54; // f32
const OFF_WATER_TEMP: usize = 0x58; // f32
const OFF_OIL_TEMP: usize = 0x5C; // f32
const OFF_TYRE_TEMP: usize = 0x60; // 4x f32: FL, FR, RL, RR
const OFF_PACKAGE_ID: usize = 0x70; // i32
const OFF_CURRENT_LAP: usize = 0x74; // i16
const OFF_TOTAL_LAPS: usize = 0x76; // i16
const OFF_BEST_LAP: usize = 0x78; // i32, ms
const OFF_LAST_LAP: usize = 0x7C; // i32, ms
const OFF_TIME_ON_TRACK: usize = 0x80; // i32, ms
const OFF_CURRENT_POSITION: usize = 0x84; // i16
const OFF_TOTAL_POSITIONS: usize = 0x86; // i16
const OFF_RPM_REV_WARNING: usize = 0x88; // u16
const OFF_RPM_REV_LIMITER: usize = 0x8A; // u16
const OFF_ESTIMATED_TOP_SPEED: usize = 0x8C; // i16
const OFF_FLAGS: usize = 0x8E; // u8: bit0 in race, bit1 paused
const OFF_GEAR_BYTE: usize = 0x90; // u8: low nibble current, high nibble suggested
const OFF_THROTTLE: usize = 0x91; // u8
const OFF_BRAKE: usize = 0x92; // u8
const OFF_WHEEL_ANGULAR_VELOCITY: usize = 0xA4; // 4x f32, rad/s
const OFF_TYRE_DIAMETER: usize = 0xB4; // 4x f32
const OFF_SUSPENSION: usize = 0xC4; // 4x f32
const OFF_CLUTCH: usize = 0xF4; // f32
const OFF_CLUTCH_ENGAGED: usize = 0xF8; // f32
const OFF_RPM_AFTER_CLUTCH: usize = 0xFC; // f32
const OFF_GEAR_RATIOS: usize = 0x104; // 8x f32
const OFF_CAR_ID: usize = 0x124; // i32

const FLAG_IN_RACE: u8 = 1 << 0;
const FLAG_PAUSED: u8 = 1 << 1;

/// m/s (or diameter * rad/s) to km/h.
const MS_TO_KMH: f64 = 3.6;
/// Pedal bytes are 0..=255; the agent reports them as 0..=100 percent.
const PEDAL_SCALE: f64 = 2.55;

/// Three-axis vector in the console's world frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    fn read(data: &[u8], offset: usize) -> Self {
        Self {
            x: read_f32(data, offset),
            y: read_f32(data, offset + 4),
            z: read_f32(data, offset + 8),
        }
    }

    /// Euclidean length.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Body orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rotation {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

/// One value per wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Wheels<T> {
    pub front_left: T,
    pub front_right: T,
    pub rear_left: T,
    pub rear_right: T,
}

impl<T> Wheels<T> {
    pub fn map<U>(self, mut f: impl FnMut(T) -> U) -> Wheels<U> {
        Wheels {
            front_left: f(self.front_left),
            front_right: f(self.front_right),
            rear_left: f(self.rear_left),
            rear_right: f(self.rear_right),
        }
    }

    pub fn zip<U>(self, other: Wheels<U>) -> Wheels<(T, U)> {
        Wheels {
            front_left: (self.front_left, other.front_left),
            front_right: (self.front_right, other.front_right),
            rear_left: (self.rear_left, other.rear_left),
            rear_right: (self.rear_right, other.rear_right),
        }
    }
}

impl Wheels<f32> {
    fn read(data: &[u8], offset: usize) -> Self {
        Self {
            front_left: read_f32(data, offset),
            front_right: read_f32(data, offset + 4),
            rear_left: read_f32(data, offset + 8),
            rear_right: read_f32(data, offset + 12),
        }
    }
}

/// Immutable snapshot decoded from one packet.
///
/// Raw wire floats stay `f32`. Quantities the agent derives (speeds, pedal
/// percentages, boost, ride height) are computed in `f64` from the widened
/// wire value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetrySample {
    /// Packet sequence number; intended to increase monotonically.
    pub package_id: i32,
    /// Lap in progress; 0 while not on a counted lap.
    pub current_lap: i16,
    pub total_laps: i16,
    /// Console-reported duration of the last completed lap, ms.
    pub last_lap_ms: i32,
    /// Console-reported best lap duration, ms.
    pub best_lap_ms: i32,
    pub time_on_track_ms: i32,
    pub current_position: i16,
    pub total_positions: i16,
    pub car_id: i32,

    pub current_gear: u8,
    pub suggested_gear: u8,
    pub gear_ratios: [f32; 8],
    /// Percent, 0..=100.
    pub throttle: f64,
    /// Percent, 0..=100.
    pub brake: f64,
    pub clutch: f32,
    pub clutch_engaged: f32,
    pub rpm: f32,
    pub rpm_after_clutch: f32,
    pub rpm_rev_warning: u16,
    pub rpm_rev_limiter: u16,
    pub estimated_top_speed: i16,

    /// km/h.
    pub car_speed: f64,
    pub current_fuel: f32,
    pub fuel_capacity: f32,
    /// Relative to atmospheric pressure.
    pub boost: f64,
    pub oil_pressure: f32,
    pub oil_temp: f32,
    pub water_temp: f32,
    /// mm.
    pub ride_height: f64,

    pub tyre_temp: Wheels<f32>,
    pub tyre_diameter: Wheels<f32>,
    /// Ground speed of each tyre, km/h, magnitude only.
    pub tyre_speed: Wheels<f64>,
    pub suspension: Wheels<f32>,

    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Rotation,
    pub angular_velocity: Vec3,

    pub paused: bool,
    pub in_race: bool,
}

impl TelemetrySample {
    fn from_bytes(d: &[u8]) -> Self {
        let gear_byte = read_u8(d, OFF_GEAR_BYTE);
        let flags = read_u8(d, OFF_FLAGS);

        let tyre_diameter = Wheels::<f32>::read(d, OFF_TYRE_DIAMETER);
        let wheel_angular_velocity = Wheels::<f32>::read(d, OFF_WHEEL_ANGULAR_VELOCITY);
        let tyre_speed = tyre_diameter
            .zip(wheel_angular_velocity)
            .map(|(diameter, omega)| (MS_TO_KMH * f64::from(diameter) * f64::from(omega)).abs());

        let mut gear_ratios = [0f32; 8];
        for (slot, offset) in gear_ratios.iter_mut().zip((OFF_GEAR_RATIOS..).step_by(4)) {
            *slot = read_f32(d, offset);
        }

        Self {
            package_id: read_i32(d, OFF_PACKAGE_ID),
            current_lap: read_i16(d, OFF_CURRENT_LAP),
            total_laps: read_i16(d, OFF_TOTAL_LAPS),
            last_lap_ms: read_i32(d, OFF_LAST_LAP),
            best_lap_ms: read_i32(d, OFF_BEST_LAP),
            time_on_track_ms: read_i32(d, OFF_TIME_ON_TRACK),
            current_position: read_i16(d, OFF_CURRENT_POSITION),
            total_positions: read_i16(d, OFF_TOTAL_POSITIONS),
            car_id: read_i32(d, OFF_CAR_ID),

            current_gear: gear_byte & 0x0F,
            suggested_gear: gear_byte >> 4,
            gear_ratios,
            throttle: f64::from(read_u8(d, OFF_THROTTLE)) / PEDAL_SCALE,
            brake: f64::from(read_u8(d, OFF_BRAKE)) / PEDAL_SCALE,
            clutch: read_f32(d, OFF_CLUTCH),
            clutch_engaged: read_f32(d, OFF_CLUTCH_ENGAGED),
            rpm: read_f32(d, OFF_ENGINE_RPM),
            rpm_after_clutch: read_f32(d, OFF_RPM_AFTER_CLUTCH),
            rpm_rev_warning: read_u16(d, OFF_RPM_REV_WARNING),
            rpm_rev_limiter: read_u16(d, OFF_RPM_REV_LIMITER),
            estimated_top_speed: read_i16(d, OFF_ESTIMATED_TOP_SPEED),

            car_speed: MS_TO_KMH * f64::from(read_f32(d, OFF_SPEED)),
            current_fuel: read_f32(d, OFF_FUEL_LEVEL),
            fuel_capacity: read_f32(d, OFF_FUEL_CAPACITY),
            boost: f64::from(read_f32(d, OFF_BOOST)) - 1.0,
            oil_pressure: read_f32(d, OFF_OIL_PRESSURE),
            oil_temp: read_f32(d, OFF_OIL_TEMP),
            water_temp: read_f32(d, OFF_WATER_TEMP),
            ride_height: 1000.0 * f64::from(read_f32(d, OFF_RIDE_HEIGHT)),

            tyre_temp: Wheels::<f32>::read(d, OFF_TYRE_TEMP),
            tyre_diameter,
            tyre_speed,
            suspension: Wheels::<f32>::read(d, OFF_SUSPENSION),

            position: Vec3::read(d, OFF_POSITION),
            velocity: Vec3::read(d, OFF_VELOCITY),
            rotation: Rotation {
                pitch: read_f32(d, OFF_ROTATION),
                yaw: read_f32(d, OFF_ROTATION + 4),
                roll: read_f32(d, OFF_ROTATION + 8),
            },
            angular_velocity: Vec3::read(d, OFF_ANGULAR_VELOCITY),

            paused: flags & FLAG_PAUSED != 0,
            in_race: flags & FLAG_IN_RACE != 0,
        }
    }

    /// Ratio of each tyre's ground speed to the car's speed.
    ///
    /// `None` while the car is stationary (or reports a non-positive speed).
    pub fn tyre_slip_ratio(&self) -> Option<Wheels<f64>> {
        (self.car_speed > 0.0).then(|| self.tyre_speed.map(|speed| speed / self.car_speed))
    }

    /// Slip ratios rendered the way the agent displays them (`{:6.2}`).
    pub fn tyre_slip_ratio_display(&self) -> Option<Wheels<String>> {
        self.tyre_slip_ratio()
            .map(|ratios| ratios.map(|r| format!("{r:6.2}")))
    }

    /// Time on track rounded to whole seconds (ties to even).
    pub fn time_on_track(&self) -> Duration {
        let secs = (f64::from(self.time_on_track_ms) / 1000.0).round_ties_even();
        Duration::from_secs_f64(secs.max(0.0))
    }
}

/// Decode a validated record. Total: every field has a fixed offset inside
/// the guaranteed [`PACKET_SIZE`] prefix.
pub fn decode(record: &DecryptedRecord) -> TelemetrySample {
    TelemetrySample::from_bytes(record.as_bytes())
}

/// Decode plaintext that may be absent or truncated.
///
/// Returns `None` (a sample with no populated fields) for empty input or
/// anything shorter than [`PACKET_SIZE`]. The magic word is not checked.
pub fn decode_plaintext(bytes: &[u8]) -> Option<TelemetrySample> {
    (bytes.len() >= PACKET_SIZE).then(|| TelemetrySample::from_bytes(bytes))
}

//! Packet builders.
//!
//! Every builder starts from a zero-filled packet carrying the magic word, so
//! any field a test does not set decodes as zero.

use gt7_protocol::{DecryptedRecord, MAGIC, PACKET_SIZE, TelemetrySample, decode, encrypt};

/// Reported `last_lap` for a sample on `lap`: lap `n` took `60 s + n s`.
pub fn reported_last_lap_ms(lap: i16) -> i32 {
    if lap <= 1 {
        -1
    } else {
        60_000 + 1000 * i32::from(lap - 1)
    }
}

/// Builder for one plaintext packet.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    buf: Vec<u8>,
}

impl Default for RecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordBuilder {
    pub fn new() -> Self {
        let mut buf = vec![0u8; PACKET_SIZE];
        buf[..4].copy_from_slice(&MAGIC.to_le_bytes());
        Self { buf }
    }

    fn put(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        self
    }

    pub fn package_id(self, id: i32) -> Self {
        self.put(0x70, &id.to_le_bytes())
    }

    pub fn current_lap(self, lap: i16) -> Self {
        self.put(0x74, &lap.to_le_bytes())
    }

    pub fn total_laps(self, laps: i16) -> Self {
        self.put(0x76, &laps.to_le_bytes())
    }

    pub fn last_lap_ms(self, ms: i32) -> Self {
        self.put(0x7C, &ms.to_le_bytes())
    }

    pub fn best_lap_ms(self, ms: i32) -> Self {
        self.put(0x78, &ms.to_le_bytes())
    }

    /// Speed in m/s as the console sends it.
    pub fn speed_ms(self, speed: f32) -> Self {
        self.put(0x4C, &speed.to_le_bytes())
    }

    pub fn position(self, x: f32, y: f32, z: f32) -> Self {
        self.put(0x04, &x.to_le_bytes())
            .put(0x08, &y.to_le_bytes())
            .put(0x0C, &z.to_le_bytes())
    }

    /// Current gear in the low nibble, suggested gear in the high nibble.
    pub fn gears(self, current: u8, suggested: u8) -> Self {
        self.put(0x90, &[(current & 0x0F) | (suggested << 4)])
    }

    pub fn throttle(self, raw: u8) -> Self {
        self.put(0x91, &[raw])
    }

    pub fn brake(self, raw: u8) -> Self {
        self.put(0x92, &[raw])
    }

    pub fn paused(mut self, paused: bool) -> Self {
        if paused {
            self.buf[0x8E] |= 0b10;
        } else {
            self.buf[0x8E] &= !0b10;
        }
        self
    }

    pub fn in_race(mut self, in_race: bool) -> Self {
        if in_race {
            self.buf[0x8E] |= 0b01;
        } else {
            self.buf[0x8E] &= !0b01;
        }
        self
    }

    pub fn plaintext(&self) -> Vec<u8> {
        self.buf.clone()
    }

    /// The datagram the console would send with IV seed `iv`.
    pub fn datagram(&self, iv: u32) -> Vec<u8> {
        encrypt(&self.buf, iv)
    }

    pub fn record(&self) -> DecryptedRecord {
        match DecryptedRecord::from_plaintext(self.buf.clone()) {
            Ok(record) => record,
            Err(e) => panic!("RecordBuilder produced an invalid record: {e}"),
        }
    }

    pub fn sample(&self) -> TelemetrySample {
        decode(&self.record())
    }
}

/// One decoded sample per entry of `laps`, with sequential package ids, x
/// position equal to the index, and `last_lap` from [`reported_last_lap_ms`].
pub fn lap_stream(laps: &[i16]) -> Vec<TelemetrySample> {
    laps.iter()
        .zip(0i32..)
        .map(|(&lap, i)| {
            RecordBuilder::new()
                .package_id(i)
                .current_lap(lap)
                .last_lap_ms(reported_last_lap_ms(lap))
                .position(i as f32, 0.0, 0.0)
                .sample()
        })
        .collect()
}

//! Gran Turismo 7 "Simulator Interface" packet codec.
//!
//! The console broadcasts one Salsa20-encrypted UDP datagram per physics tick
//! to any host that has recently sent it a keepalive byte. This crate turns a
//! raw datagram into a [`TelemetrySample`] in two steps:
//!
//! 1. [`decrypt`] derives the per-packet nonce from the raw bytes, applies the
//!    keystream and checks the magic word. Anything short or mis-keyed comes
//!    back as [`InvalidPacket`], which callers treat as "no sample this tick".
//! 2. [`decode`] reads the fixed little-endian field layout out of a
//!    [`DecryptedRecord`].
//!
//! # Protocol overview
//! - Telemetry arrives on UDP port [`RECV_PORT`] (33740).
//! - The keepalive byte [`KEEPALIVE_PAYLOAD`] goes to port [`KEEPALIVE_PORT`]
//!   (33739) on the console.
//! - Key: first 32 bytes of `"Simulator Interface Packet GT7 ver 0.0"`.
//! - Nonce: `iv = LE_u32(raw[0x40..0x44])`, nonce = `le(iv ^ 0xDEADBEAF) ++ le(iv)`.
//! - Magic: `0x47375330` ("0S7G" little-endian) in bytes 0..4 of the plaintext.
//!
//! No I/O happens here; sockets live in `gt7-capture`.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(rust_2018_idioms)]

pub mod cipher;
pub mod export;
pub mod lap_time;
pub mod record;
pub mod sample;
mod wire;

pub use export::{ExportMode, LapPoints, TelemetryPoint, TrackPoint};
pub use lap_time::LapTime;
pub use record::{DecryptedRecord, InvalidPacket, decrypt, encrypt};
pub use sample::{Rotation, TelemetrySample, Vec3, Wheels, decode, decode_plaintext};

/// UDP port on which the console broadcasts telemetry.
pub const RECV_PORT: u16 = 33740;
/// UDP port on the console that accepts keepalive datagrams.
pub const KEEPALIVE_PORT: u16 = 33739;
/// Single-byte keepalive payload requesting the standard packet layout.
pub const KEEPALIVE_PAYLOAD: &[u8; 1] = b"A";

/// Size of the standard packet layout (0x128 bytes).
pub const PACKET_SIZE: usize = 0x128;
/// Receive buffer size; comfortably larger than any known packet layout.
pub const MAX_DATAGRAM_SIZE: usize = 4096;
/// Magic word found in bytes 0..4 of a correctly decrypted packet.
pub const MAGIC: u32 = 0x4737_5330;

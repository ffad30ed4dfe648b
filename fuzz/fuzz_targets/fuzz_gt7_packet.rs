//! Fuzzes the Gran Turismo 7 packet decryptor and decoder.
//!
//! Arbitrary bytes go through Salsa20 decryption, the magic check and the
//! fixed-offset field decode.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_gt7_packet
#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Must never panic on arbitrary bytes. Errors are expected, panics are not.
    if let Ok(record) = gt7_protocol::decrypt(data) {
        let sample = gt7_protocol::decode(&record);
        let _ = sample.tyre_slip_ratio();
        let _ = sample.time_on_track();
    }
    let _ = gt7_protocol::decode_plaintext(data);
});

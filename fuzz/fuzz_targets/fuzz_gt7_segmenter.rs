//! Fuzzes the lap segmenter with arbitrary lap-counter sequences.
//!
//! Each `PACKET_SIZE` chunk of input is decoded as one plaintext record and
//! pushed through the segmenter. Samples are never invented:
//! everything emitted plus everything pending came from the input.
//!
//! Run with:
//!   cargo +nightly fuzz run fuzz_gt7_segmenter
#![no_main]

use gt7_capture::LapSegmenter;
use gt7_protocol::{PACKET_SIZE, decode_plaintext};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut segmenter = LapSegmenter::new();
    let mut pushed = 0usize;
    let mut emitted = 0usize;

    for chunk in data.chunks_exact(PACKET_SIZE) {
        let Some(sample) = decode_plaintext(chunk) else {
            continue;
        };
        pushed += 1;
        if let Some(batch) = segmenter.push(sample) {
            assert!(!batch.is_empty());
            emitted += batch.len();
        }
    }

    assert!(emitted + segmenter.pending() <= pushed);
});

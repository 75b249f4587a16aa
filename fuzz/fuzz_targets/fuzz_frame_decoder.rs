//! Fuzz target: RDM6300 `FrameDecoder::feed`
//!
//! Drives arbitrary bytes into the frame decoder, then a known-good frame.
//! The decoder must never panic and must always resynchronize on the STX
//! of the good frame, whatever garbage preceded it.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use slotkeeper::drivers::rdm6300::FrameDecoder;

// Tag 0x007B3CD2, version byte 0x1A, checksum 0x8F.
const GOOD_FRAME: &[u8] = b"\x021A007B3CD28F\x03";

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();
    for &byte in data {
        let _ = decoder.feed(byte);
    }

    let tags: Vec<u32> = GOOD_FRAME.iter().filter_map(|&b| decoder.feed(b)).collect();
    assert_eq!(tags, [0x007B_3CD2], "decoder failed to resync");
});

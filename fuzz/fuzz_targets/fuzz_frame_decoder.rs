//! Fuzz target: `FrameDecoder::feed`
//!
//! Drives arbitrary capture-sample sequences into the AM2302 frame decoder
//! and asserts that it never panics, only yields checksum-valid packets,
//! and always rewinds after a packet or an error.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use growbox::sensors::am2302::FrameDecoder;
use growbox::sensors::capture::CaptureSample;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut decoder = FrameDecoder::new();

    // Each 4 bytes form one sample: u16 period, u16 sub-phase.
    for chunk in data.chunks_exact(4) {
        let period = u32::from(u16::from_le_bytes([chunk[0], chunk[1]]));
        let sub = u32::from(u16::from_le_bytes([chunk[2], chunk[3]]));
        match decoder.feed(CaptureSample::new(period, sub)) {
            Ok(Some(packet)) => {
                assert!(packet.checksum_ok(), "decoder yielded a bad checksum");
                assert_eq!(decoder.bits_received(), 0, "decoder must rewind after a packet");
            }
            Ok(None) => assert!(decoder.bits_received() < 40),
            Err(_) => assert_eq!(decoder.bits_received(), 0, "decoder must rewind after an error"),
        }
    }
});

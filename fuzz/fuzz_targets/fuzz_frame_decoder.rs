//! Fuzz target: `FrameDecoder::push`
//!
//! Drives arbitrary byte sequences into the streaming frame decoder, with
//! and without end-marker lookahead, and asserts that frames never exceed
//! the receive buffer and that a reset always returns it to idle.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use homeauto::protocol::codec::{FrameDecoder, MAX_FRAME_LEN, verify};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for lookahead in [false, true] {
        let mut decoder = FrameDecoder::new(lookahead);
        for &byte in data {
            if let Some(frame) = decoder.push(byte) {
                assert!(frame.len() <= MAX_FRAME_LEN, "frame exceeds receive buffer");
                let _ = verify(&frame, lookahead);
            }
        }
        if let Some(frame) = decoder.finish_idle() {
            assert!(frame.len() <= MAX_FRAME_LEN);
        }

        decoder.reset();
        assert!(!decoder.in_progress());
    }
});

//! Marker-delimited frame codec.
//!
//! Wire format:
//! ```text
//! ┌─────┬──────────────────────┬───────────┬─────┐
//! │ '[' │ payload (≤ 31 bytes) │ CRC-8 (1) │ ']' │
//! └─────┴──────────────────────┴───────────┴─────┘
//!                               └ only when inbound checksum is enabled
//! ```
//!
//! The checksum byte may itself equal `']'`.  With inbound checksum
//! enabled the decoder therefore looks one byte past an end marker: a
//! second `']'` means the first was data; anything else means the frame
//! had already ended.  That lookahead byte is consumed.
//!
//! Bytes past [`MAX_FRAME_LEN`] are dropped without aborting the frame.

use heapless::Vec;
use log::debug;

use super::crc::{Crc8, crc8};
use crate::error::FrameError;

pub const START_MARKER: u8 = b'[';
pub const END_MARKER: u8 = b']';

/// Acknowledge code.
pub const ACK: u8 = 0x06;
/// Negative-acknowledge code.
pub const NAK: u8 = 0x15;

/// Receive buffer capacity (payload plus checksum).
pub const MAX_FRAME_LEN: usize = 32;

/// Maximum payload bytes in a get reply.
pub const MAX_REPLY_PAYLOAD: usize = 10;

/// Raw frame contents between the markers.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

// ═══════════════════════════════════════════════════════════════
//  Decoder
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderState {
    /// Discarding bytes until a start marker.
    Idle,
    /// Collecting frame bytes.
    Receiving,
    /// Saw an end marker, waiting for the lookahead byte.
    PendingEnd,
}

/// Streaming frame decoder, one per interface.
pub struct FrameDecoder {
    state: DecoderState,
    buf: Frame,
    lookahead: bool,
}

impl FrameDecoder {
    /// `lookahead` should follow the inbound checksum setting.
    pub fn new(lookahead: bool) -> Self {
        Self { state: DecoderState::Idle, buf: Vec::new(), lookahead }
    }

    /// Push one byte.  Returns a frame when this byte completed one.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        match self.state {
            DecoderState::Idle => {
                if byte == START_MARKER {
                    self.begin();
                }
                None
            }
            DecoderState::Receiving => {
                if byte != END_MARKER {
                    self.store(byte);
                    None
                } else if self.lookahead {
                    self.state = DecoderState::PendingEnd;
                    None
                } else {
                    Some(self.complete())
                }
            }
            DecoderState::PendingEnd => {
                if byte == END_MARKER {
                    self.store(END_MARKER);
                }
                let frame = self.complete();
                if byte == START_MARKER {
                    self.begin();
                }
                Some(frame)
            }
        }
    }

    /// Feed a run of bytes, handing every completed frame to `on_frame`.
    pub fn feed(&mut self, data: &[u8], mut on_frame: impl FnMut(Frame)) {
        for &byte in data {
            if let Some(frame) = self.push(byte) {
                on_frame(frame);
            }
        }
    }

    /// The transport has no more bytes for now.  A frame whose end marker
    /// is still waiting for its lookahead byte completes here.
    pub fn finish_idle(&mut self) -> Option<Frame> {
        (self.state == DecoderState::PendingEnd).then(|| self.complete())
    }

    /// Drop any partial frame (a new datagram, a reconnect).
    pub fn reset(&mut self) {
        self.state = DecoderState::Idle;
        self.buf.clear();
    }

    /// Follow a change of the inbound checksum setting.
    pub fn set_lookahead(&mut self, lookahead: bool) {
        self.lookahead = lookahead;
    }

    /// `true` while a frame is partially received.
    pub fn in_progress(&self) -> bool {
        self.state != DecoderState::Idle
    }

    fn begin(&mut self) {
        self.buf.clear();
        self.state = DecoderState::Receiving;
    }

    fn store(&mut self, byte: u8) {
        if self.buf.push(byte).is_err() {
            debug!("codec: frame buffer full, byte dropped");
        }
    }

    fn complete(&mut self) -> Frame {
        self.state = DecoderState::Idle;
        core::mem::take(&mut self.buf)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Checksum gate
// ═══════════════════════════════════════════════════════════════

/// Split off and verify the trailing checksum.  With checking disabled the
/// whole frame is payload.
pub fn verify(frame: &[u8], checksum: bool) -> Result<&[u8], FrameError> {
    if !checksum {
        return Ok(frame);
    }
    let (&received, payload) = frame.split_last().ok_or(FrameError::Empty)?;
    let expected = crc8(payload);
    if expected == received {
        Ok(payload)
    } else {
        Err(FrameError::ChecksumMismatch { expected, received })
    }
}

/// Wrap a payload in markers, appending its checksum when enabled.
/// Used by host tooling and tests to build requests.
pub fn encode_request(payload: &[u8], checksum: bool) -> Vec<u8, { MAX_FRAME_LEN + 2 }> {
    let mut out = Vec::new();
    let _ = out.push(START_MARKER);
    let room = MAX_FRAME_LEN - usize::from(checksum);
    let _ = out.extend_from_slice(&payload[..payload.len().min(room)]);
    if checksum {
        let _ = out.push(crc8(&payload[..payload.len().min(room)]));
    }
    let _ = out.push(END_MARKER);
    out
}

// ═══════════════════════════════════════════════════════════════
//  Replies
// ═══════════════════════════════════════════════════════════════

/// Response to one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Set succeeded: a lone ACK.
    Ack,
    /// Rejected: a lone NAK, never checksummed.
    Nak,
    /// Get succeeded: ACK followed by data.
    Data(Vec<u8, MAX_REPLY_PAYLOAD>),
}

impl Reply {
    /// Data reply; bytes past [`MAX_REPLY_PAYLOAD`] are not sent.
    pub fn bytes(data: &[u8]) -> Self {
        let mut payload = Vec::new();
        let _ = payload.extend_from_slice(&data[..data.len().min(MAX_REPLY_PAYLOAD)]);
        Self::Data(payload)
    }

    pub fn flag(value: bool) -> Self {
        Self::bytes(&[u8::from(value)])
    }

    pub fn word(value: u16) -> Self {
        Self::bytes(&value.to_be_bytes())
    }

    pub fn float(value: f32) -> Self {
        Self::bytes(&value.to_be_bytes())
    }

    pub fn is_nak(&self) -> bool {
        matches!(self, Self::Nak)
    }

    /// Bytes to put on the wire.  The checksum covers the data bytes only.
    pub fn encode(&self, checksum: bool) -> Vec<u8, { MAX_REPLY_PAYLOAD + 2 }> {
        let mut out = Vec::new();
        match self {
            Self::Ack => {
                let _ = out.push(ACK);
            }
            Self::Nak => {
                let _ = out.push(NAK);
            }
            Self::Data(payload) => {
                let _ = out.push(ACK);
                let _ = out.extend_from_slice(payload);
                if checksum {
                    let mut crc = Crc8::new();
                    crc.update(payload);
                    let _ = out.push(crc.value());
                }
            }
        }
        out
    }
}

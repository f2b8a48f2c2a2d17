//! Unified error types for the controller core.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! run loop's error handling uniform. All variants are `Copy` so they can
//! be passed through the dispatcher and logged without allocation.
//!
//! There is no "schedule invalid" error: a slot that fails validation is
//! disarmed, not reported (see
//! [`SlotOutcome`](crate::alarm::engine::SlotOutcome)).

use core::fmt;

use crate::app::ports::{ConfigError, StorageError};

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible operation in the core funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A received frame failed checksum or framing checks.
    Frame(FrameError),
    /// A decoded payload did not name a valid command.
    Command(CommandError),
    /// The non-volatile store could not be read or written.
    Storage(StorageError),
    /// Configuration is invalid or could not be loaded.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Frame(e) => write!(f, "frame: {e}"),
            Self::Command(e) => write!(f, "command: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Framing errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Trailing checksum byte does not match the CRC of the payload.
    ChecksumMismatch { expected: u8, received: u8 },
    /// Inbound checksum is enabled but the frame carried no bytes at all.
    Empty,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChecksumMismatch { expected, received } => write!(
                f,
                "checksum mismatch (expected 0x{expected:02X}, received 0x{received:02X})"
            ),
            Self::Empty => write!(f, "empty frame"),
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Reasons a payload is answered with NAK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandError {
    /// First payload byte is not a known command family.
    UnknownFamily(u8),
    /// Family is known but the get/set or sub-operation byte is not.
    UnknownOperation,
    /// Channel digit outside the family's channel range.
    ChannelOutOfRange,
    /// An argument byte is not an accepted digit / flag.
    BadArgument,
    /// Payload length does not match the fixed length of the command.
    BadLength,
    /// An inline date or time string could not be parsed.
    MalformedTime,
    /// The collaborator backing the command could not be read.
    HardwareUnavailable,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownFamily(b) => write!(f, "unknown family 0x{b:02X}"),
            Self::UnknownOperation => write!(f, "unknown operation"),
            Self::ChannelOutOfRange => write!(f, "channel out of range"),
            Self::BadArgument => write!(f, "bad argument"),
            Self::BadLength => write!(f, "bad payload length"),
            Self::MalformedTime => write!(f, "malformed date/time"),
            Self::HardwareUnavailable => write!(f, "hardware unavailable"),
        }
    }
}

impl From<CommandError> for Error {
    fn from(e: CommandError) -> Self {
        Self::Command(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subsystem_errors_convert() {
        let e: Error = CommandError::UnknownFamily(b'Z').into();
        assert_eq!(e, Error::Command(CommandError::UnknownFamily(b'Z')));
        let e: Error = StorageError::OutOfRange { offset: 64 }.into();
        assert!(matches!(e, Error::Storage(_)));
    }

    #[test]
    fn display_names_the_subsystem() {
        let e = Error::from(FrameError::ChecksumMismatch { expected: 0x5D, received: 0x00 });
        assert_eq!(e.to_string(), "frame: checksum mismatch (expected 0x5D, received 0x00)");
        assert_eq!(Error::from(CommandError::UnknownFamily(b'Q')).to_string(), "command: unknown family 0x51");
    }
}

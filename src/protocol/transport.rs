//! Transport abstraction for the two command links.
//!
//! - Serial: a byte stream; frames may span several reads.
//! - Network: datagrams; each datagram carries one request and the reply
//!   goes back to its sender.
//!
//! The dispatcher never sees a transport.  The controller moves bytes
//! between these traits and the per-interface decoders.

use core::fmt;

/// Which link a frame arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interface {
    Serial,
    Network,
}

impl Interface {
    pub const COUNT: usize = 2;

    pub const fn index(self) -> usize {
        match self {
            Self::Serial => 0,
            Self::Network => 1,
        }
    }
}

impl fmt::Display for Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "serial"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// Byte-oriented stream transport.
pub trait Transport {
    type Error: fmt::Debug;

    /// Read whatever is available into `buf` without blocking.
    /// Returns 0 when nothing is pending.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    fn flush(&mut self) -> Result<(), Self::Error>;
}

/// Datagram transport that remembers the last sender.
pub trait DatagramTransport {
    type Error: fmt::Debug;

    /// Receive one pending datagram into `buf` without blocking.
    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, Self::Error>;

    /// Send `data` to the sender of the last received datagram.
    fn reply(&mut self, data: &[u8]) -> Result<(), Self::Error>;
}

/// A transport that never receives and discards writes.
/// Stands in for a link that is not present.
pub struct NullTransport;

impl Transport for NullTransport {
    type Error = ();

    fn read(&mut self, _buf: &mut [u8]) -> Result<usize, ()> {
        Ok(0)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

impl DatagramTransport for NullTransport {
    type Error = ();

    fn recv(&mut self, _buf: &mut [u8]) -> Result<Option<usize>, ()> {
        Ok(None)
    }

    fn reply(&mut self, _data: &[u8]) -> Result<(), ()> {
        Ok(())
    }
}

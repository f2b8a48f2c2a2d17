//! UDP datagram transport.
//!
//! Implements [`DatagramTransport`] over a non-blocking
//! `std::net::UdpSocket`.  Each datagram carries one request; the reply
//! goes back to whoever sent the most recent datagram.

use core::fmt;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};

use log::{debug, info, warn};

use crate::protocol::transport::DatagramTransport;

/// Errors originating from the UDP transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UdpError {
    /// Socket I/O failure.
    Io,
    /// A reply was attempted before any datagram arrived.
    NoPeer,
}

impl fmt::Display for UdpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "UDP socket I/O error"),
            Self::NoPeer => write!(f, "no datagram received yet"),
        }
    }
}

pub struct UdpTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    /// Bind on all interfaces at `port` (0 picks a free port).
    pub fn bind(port: u16) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", port))?;
        socket.set_nonblocking(true)?;
        info!("udp: listening on {}", socket.local_addr()?);
        Ok(Self { socket, peer: None })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }
}

impl DatagramTransport for UdpTransport {
    type Error = UdpError;

    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, UdpError> {
        match self.socket.recv_from(buf) {
            Ok((n, from)) => {
                debug!("udp: {n} bytes from {from}");
                self.peer = Some(from);
                Ok(Some(n))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => Ok(None),
            Err(e) => {
                warn!("udp: receive failed: {e}");
                Err(UdpError::Io)
            }
        }
    }

    fn reply(&mut self, data: &[u8]) -> Result<(), UdpError> {
        let peer = self.peer.ok_or(UdpError::NoPeer)?;
        self.socket.send_to(data, peer).map_err(|e| {
            warn!("udp: reply to {peer} failed: {e}");
            UdpError::Io
        })?;
        Ok(())
    }
}

//! Serial link over the host's standard streams.
//!
//! A reader thread forwards stdin chunks through an `mpsc` channel so that
//! [`Transport::read`] never blocks the run loop.  Replies go to stdout.

use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use log::{info, warn};

use crate::protocol::transport::Transport;

/// Errors originating from the stdio serial link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialError {
    Io,
}

impl core::fmt::Display for SerialError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "serial I/O error")
    }
}

pub struct StdioSerial {
    rx: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    closed: bool,
}

impl StdioSerial {
    /// Start the stdin reader thread.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let mut stdin = std::io::stdin().lock();
            let mut buf = [0u8; 64];
            loop {
                match stdin.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(buf[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("serial: stdin read failed: {e}");
                        break;
                    }
                }
            }
            info!("serial: stdin closed");
        });
        Self::from_receiver(rx)
    }

    /// Serial link fed from an arbitrary chunk source.
    pub fn from_receiver(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx, pending: Vec::new(), closed: false }
    }

    /// `true` once the input side has hung up and everything was read.
    pub fn is_closed(&self) -> bool {
        self.closed && self.pending.is_empty()
    }
}

impl Transport for StdioSerial {
    type Error = SerialError;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, SerialError> {
        while self.pending.len() < buf.len() {
            match self.rx.try_recv() {
                Ok(chunk) => self.pending.extend_from_slice(&chunk),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
        let n = self.pending.len().min(buf.len());
        buf[..n].copy_from_slice(&self.pending[..n]);
        self.pending.drain(..n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, SerialError> {
        std::io::stdout().write_all(data).map_err(|_| SerialError::Io)?;
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), SerialError> {
        std::io::stdout().flush().map_err(|_| SerialError::Io)
    }
}

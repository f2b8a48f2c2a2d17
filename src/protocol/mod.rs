//! Framed command protocol shared by the serial and network links.
//!
//! - [`crc`]: CRC-8, polynomial 0x07.
//! - [`codec`]: marker framing and reply encoding.
//! - [`command`]: typed command records.
//! - [`dispatch`]: checksum gate and command execution.
//! - [`transport`]: byte-stream and datagram link traits.

pub mod codec;
pub mod command;
pub mod crc;
pub mod dispatch;
pub mod transport;

pub use codec::{FrameDecoder, Reply};
pub use command::Command;
pub use dispatch::{DispatchContext, Dispatcher};
pub use transport::Interface;

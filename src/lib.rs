//! HomeAuto controller library.
//!
//! The controller core of a home-automation board: a framed command
//! protocol shared by a serial and a network link, and an alarm/timer
//! engine that drives four relays from persisted daily or cyclic
//! schedules.  All hardware access goes through the traits in
//! [`app::ports`]; host implementations live in [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod alarm;
pub mod app;
pub mod channel;
pub mod clock;
pub mod config;
pub mod drivers;
pub mod error;
pub mod phase;
pub mod protocol;
pub mod scheduler;

pub use error::{Error, Result};

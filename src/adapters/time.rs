//! Real-time clock adapters.
//!
//! - [`HostRtc`]: the host's system clock plus an offset that a client
//!   set-time moves, standing in for a battery-backed RTC chip.
//! - [`FixedRtc`]: a manually driven clock for tests; it can be made to
//!   stop answering.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::app::ports::{RealTimeClock, RtcError};
use crate::clock::DateTime;

/// Host system clock with a settable offset.
pub struct HostRtc {
    offset_secs: i64,
}

impl Default for HostRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRtc {
    pub fn new() -> Self {
        Self { offset_secs: 0 }
    }

    fn host_epoch() -> Result<i64, RtcError> {
        let secs = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|_| RtcError::Halted)?.as_secs();
        i64::try_from(secs).map_err(|_| RtcError::Halted)
    }
}

impl RealTimeClock for HostRtc {
    fn read(&mut self) -> Result<DateTime, RtcError> {
        let epoch = Self::host_epoch()? + self.offset_secs;
        let epoch = u64::try_from(epoch).map_err(|_| RtcError::Halted)?;
        Ok(DateTime::from_epoch(epoch))
    }

    fn write(&mut self, time: &DateTime) -> Result<(), RtcError> {
        let target = i64::try_from(time.to_epoch()).map_err(|_| RtcError::Halted)?;
        self.offset_secs = target - Self::host_epoch()?;
        Ok(())
    }
}

/// Milliseconds since the adapter was created.  Drives the run loop.
pub struct Uptime {
    start: Instant,
}

impl Default for Uptime {
    fn default() -> Self {
        Self::new()
    }
}

impl Uptime {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn millis(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Test clock.  `None` models a chip that does not answer.
#[derive(Debug, Clone, Default)]
pub struct FixedRtc {
    time: Option<DateTime>,
}

impl FixedRtc {
    pub fn new(time: Option<DateTime>) -> Self {
        Self { time }
    }

    pub fn set(&mut self, time: Option<DateTime>) {
        self.time = time;
    }

    pub fn advance(&mut self, secs: u64) {
        if let Some(time) = self.time {
            self.time = Some(DateTime::from_epoch(time.to_epoch() + secs));
        }
    }

    pub fn time(&self) -> Option<DateTime> {
        self.time
    }
}

impl RealTimeClock for FixedRtc {
    fn read(&mut self) -> Result<DateTime, RtcError> {
        self.time.ok_or(RtcError::NotResponding)
    }

    fn write(&mut self, time: &DateTime) -> Result<(), RtcError> {
        if self.time.is_none() {
            return Err(RtcError::NotResponding);
        }
        self.time = Some(*time);
        Ok(())
    }
}

//! Opto-isolated DC outputs with pulse counting.
//!
//! Besides plain on/off, a client can request pulses on a channel.  Pulses
//! are produced by the opto [`PhasedOperation`](crate::phase::PhasedOperation):
//! [`begin_pulses`](OptoPort::begin_pulses) raises every output that still
//! owes pulses and counts one pulse each, [`end_pulses`](OptoPort::end_pulses)
//! lowers only the outputs that have caught up.  A burst of n pulses is
//! therefore one output held high across n phase cycles.
//!
//! Requested and executed counts are wrapping `u16`s; a channel owes pulses
//! while the two differ.  The requested total is what clients read back.

use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::OptoPort;
use crate::channel::ChannelId;

pub struct OptoBank<P> {
    pins: [P; ChannelId::COUNT],
    state: [bool; ChannelId::COUNT],
    requested: [u16; ChannelId::COUNT],
    executed: [u16; ChannelId::COUNT],
    pulsing: [bool; ChannelId::COUNT],
}

impl<P: OutputPin> OptoBank<P> {
    pub fn new(pins: [P; ChannelId::COUNT]) -> Self {
        let mut bank = Self {
            pins,
            state: [false; ChannelId::COUNT],
            requested: [0; ChannelId::COUNT],
            executed: [0; ChannelId::COUNT],
            pulsing: [false; ChannelId::COUNT],
        };
        for channel in ChannelId::all() {
            bank.drive(channel, false);
        }
        bank
    }

    /// Pulses executed so far on `channel`.
    pub fn executed(&self, channel: ChannelId) -> u16 {
        self.executed[channel.index()]
    }

    pub fn pin(&self, channel: ChannelId) -> &P {
        &self.pins[channel.index()]
    }

    fn drive(&mut self, channel: ChannelId, on: bool) {
        let pin = &mut self.pins[channel.index()];
        let result = if on { pin.set_high() } else { pin.set_low() };
        if let Err(e) = result {
            warn!("opto: channel {channel} pin write failed: {e:?}");
        }
        self.state[channel.index()] = on;
    }
}

impl<P: OutputPin> OptoPort for OptoBank<P> {
    fn set_opto(&mut self, channel: ChannelId, on: bool) {
        self.drive(channel, on);
    }

    fn opto(&self, channel: ChannelId) -> bool {
        self.state[channel.index()]
    }

    fn pulse_count(&self, channel: ChannelId) -> u16 {
        self.requested[channel.index()]
    }

    fn request_pulses(&mut self, channel: ChannelId, n: u8) {
        let i = channel.index();
        self.requested[i] = self.requested[i].wrapping_add(u16::from(n));
        debug!("opto: channel {channel} owes {} pulses", self.requested[i].wrapping_sub(self.executed[i]));
    }

    fn begin_pulses(&mut self) {
        for channel in ChannelId::all() {
            let i = channel.index();
            if self.requested[i] != self.executed[i] {
                self.drive(channel, true);
                self.executed[i] = self.executed[i].wrapping_add(1);
                self.pulsing[i] = true;
            }
        }
    }

    fn end_pulses(&mut self) {
        for channel in ChannelId::all() {
            let i = channel.index();
            if self.pulsing[i] && self.executed[i] == self.requested[i] {
                self.pulsing[i] = false;
                self.drive(channel, false);
            }
        }
    }
}

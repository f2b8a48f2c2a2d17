//! Solid-state relay bank.
//!
//! Four AC outputs, one [`OutputPin`] each, active high.  Writes always
//! reach the pin, so repeating a value is harmless and re-asserts it.
//!
//! A pin error is logged and the commanded state is still recorded: the
//! next write (alarm, resync or client) retries the pin.

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::RelayPort;
use crate::channel::ChannelId;

pub struct RelayBank<P> {
    pins: [P; ChannelId::COUNT],
    state: [bool; ChannelId::COUNT],
}

impl<P: OutputPin> RelayBank<P> {
    /// Take the pins and drive every relay off.
    pub fn new(pins: [P; ChannelId::COUNT]) -> Self {
        let mut bank = Self { pins, state: [false; ChannelId::COUNT] };
        bank.set_all_relays(false);
        bank
    }

    pub fn pin(&self, channel: ChannelId) -> &P {
        &self.pins[channel.index()]
    }
}

impl<P: OutputPin> RelayPort for RelayBank<P> {
    fn set_relay(&mut self, channel: ChannelId, on: bool) {
        let pin = &mut self.pins[channel.index()];
        let result = if on { pin.set_high() } else { pin.set_low() };
        if let Err(e) = result {
            warn!("relay: channel {channel} pin write failed: {e:?}");
        }
        self.state[channel.index()] = on;
    }

    fn relay(&self, channel: ChannelId) -> bool {
        self.state[channel.index()]
    }
}

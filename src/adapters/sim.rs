//! Simulated hardware for the host build and tests.
//!
//! | Type         | Implements                   |
//! |--------------|------------------------------|
//! | `SimPin`     | `embedded_hal` `OutputPin`   |
//! | `SimProbes`  | `TemperaturePort`            |
//! | `SimAnalog`  | `AnalogPort`                 |
//! | `SimButtons` | `ButtonPort`                 |
//! | `SimNetwork` | `NetworkPort`                |
//!
//! Values are injected through the inherent setters.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::{debug, info};

use crate::app::ports::{AnalogPort, ButtonPort, NETWORK_CONNECTED, NetworkPort, TemperaturePort};
use crate::channel::{ChannelId, InputId};

// ── Output pin ────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SimPin {
    high: bool,
    writes: u32,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    /// Number of writes seen, including repeats.
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.high = false;
        self.writes += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.high = true;
        self.writes += 1;
        Ok(())
    }
}

// ── Temperature probes ────────────────────────────────────────

/// Probe bus.  A probe is recognised once a reading has been injected.
/// Injected readings become visible after the next finished conversion,
/// unless no conversion has run yet.
#[derive(Debug, Clone, Default)]
pub struct SimProbes {
    pending: [Option<f32>; ChannelId::COUNT],
    readings: [Option<f32>; ChannelId::COUNT],
    converting: bool,
    conversions: u32,
}

impl SimProbes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a probe reading `celsius`.
    pub fn set(&mut self, probe: ChannelId, celsius: f32) {
        self.pending[probe.index()] = Some(celsius);
        if self.conversions == 0 {
            self.readings[probe.index()] = Some(celsius);
        }
    }

    pub fn conversions(&self) -> u32 {
        self.conversions
    }
}

impl TemperaturePort for SimProbes {
    fn probe_count(&self) -> u8 {
        self.pending.iter().flatten().count() as u8
    }

    fn is_recognized(&self, probe: ChannelId) -> bool {
        self.pending[probe.index()].is_some()
    }

    fn celsius(&self, probe: ChannelId) -> f32 {
        self.readings[probe.index()].unwrap_or(0.0)
    }

    fn start_conversion(&mut self) {
        self.converting = true;
    }

    fn finish_conversion(&mut self) {
        if !core::mem::take(&mut self.converting) {
            return;
        }
        self.readings = self.pending;
        self.conversions += 1;
        debug!("sim: probe conversion {} done", self.conversions);
    }
}

// ── Analog inputs ─────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SimAnalog {
    values: [f32; InputId::COUNT],
    samples: u32,
}

impl SimAnalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, input: InputId, value: f32) {
        self.values[input.index()] = value;
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }
}

impl AnalogPort for SimAnalog {
    fn sample(&mut self) {
        self.samples += 1;
    }

    fn value(&self, input: InputId) -> f32 {
        self.values[input.index()]
    }
}

// ── Push buttons ──────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SimButtons {
    states: [bool; InputId::COUNT],
    presses: [u16; InputId::COUNT],
    latch: bool,
    trigger: bool,
}

impl SimButtons {
    pub fn new() -> Self {
        Self::default()
    }

    /// Press and release `input` once.  Also pulls the override trigger.
    pub fn press(&mut self, input: InputId) {
        let i = input.index();
        self.presses[i] = self.presses[i].wrapping_add(1);
        self.trigger = true;
    }

    pub fn set_state(&mut self, input: InputId, pressed: bool) {
        self.states[input.index()] = pressed;
    }

    pub fn set_latch(&mut self, engaged: bool) {
        self.latch = engaged;
    }
}

impl ButtonPort for SimButtons {
    fn debounce(&mut self) {}

    fn state(&self, input: InputId) -> bool {
        self.states[input.index()]
    }

    fn press_count(&self, input: InputId) -> u16 {
        self.presses[input.index()]
    }

    fn latch_engaged(&self) -> bool {
        self.latch
    }

    fn take_trigger(&mut self) -> bool {
        core::mem::take(&mut self.trigger)
    }
}

// ── Network ───────────────────────────────────────────────────

/// Status word of a link that is down.
pub const NETWORK_DISCONNECTED: u16 = 6;

#[derive(Debug, Clone)]
pub struct SimNetwork {
    status: u16,
    address: [u8; 4],
    rssi: i32,
    checks: u32,
}

impl SimNetwork {
    pub fn connected(address: [u8; 4], rssi: i32) -> Self {
        Self { status: NETWORK_CONNECTED, address, rssi, checks: 0 }
    }

    pub fn disconnected() -> Self {
        Self { status: NETWORK_DISCONNECTED, address: [0; 4], rssi: 0, checks: 0 }
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    /// Number of connection checks run.
    pub fn checks(&self) -> u32 {
        self.checks
    }
}

impl NetworkPort for SimNetwork {
    fn status(&self) -> u16 {
        self.status
    }

    fn local_address(&self) -> [u8; 4] {
        self.address
    }

    fn signal_strength(&self) -> i32 {
        self.rssi
    }

    fn maintain(&mut self) {
        self.checks += 1;
        if !self.is_connected() {
            info!("sim: network down (status {}), reconnect requested", self.status);
        }
    }
}

//! Port traits: the hexagonal boundary between the controller core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller / AlarmEngine / Dispatcher
//! ```
//!
//! Driven adapters (EEPROM, RTC, relay and opto drivers, sensors, network,
//! event sinks) implement these traits.  The core consumes them through
//! generics or `&mut dyn` references, so nothing in `alarm` or `protocol`
//! touches hardware directly.
//!
//! ## Contracts
//!
//! - Output writes ([`RelayPort`], [`OptoPort`]) MUST be idempotent.  The
//!   dispatcher and alarm firings both write outputs and may repeat a value.
//! - [`NonVolatileStore`] reads of never-written bytes return whatever the
//!   medium holds; callers treat every byte as untrusted.
//! - Every port error is typed and `Copy`.

use core::fmt;

use crate::channel::{ChannelId, InputId};
use crate::clock::DateTime;
use crate::config::ControllerConfig;

// ───────────────────────────────────────────────────────────────
// Non-volatile store (driven adapter: core ↔ EEPROM)
// ───────────────────────────────────────────────────────────────

/// Byte-addressable persistent storage with a fixed capacity.
pub trait NonVolatileStore {
    /// Total number of addressable bytes.
    fn capacity(&self) -> usize;

    fn read_byte(&self, offset: usize) -> Result<u8, StorageError>;

    fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), StorageError>;

    /// Write a run of bytes starting at `offset`.
    ///
    /// The range is checked up front so nothing is written when any byte
    /// would fall outside the store.  Media that can commit a block in one
    /// operation should override this.
    fn write_block(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let end = offset + data.len();
        if end > self.capacity() {
            return Err(StorageError::OutOfRange { offset: end.saturating_sub(1) });
        }
        for (i, byte) in data.iter().enumerate() {
            self.write_byte(offset + i, *byte)?;
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Time source (recurring wall-clock events)
// ───────────────────────────────────────────────────────────────

/// When a registration fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recurrence {
    /// Every day at the given second of the day (`0..86400`).
    Daily { second_of_day: u32 },
    /// Every `period_secs`, counted from registration.
    Every { period_secs: u32 },
    /// Once, `delay_secs` after registration, then the registration frees itself.
    Once { delay_secs: u32 },
}

/// What an alarm firing asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmAction {
    /// OnOff on-slot reached.
    SwitchOn,
    /// OnOff off-slot reached.
    SwitchOff,
    /// Cycle period elapsed: start a duty run.
    CycleStart,
    /// Cycle duty run finished.
    CycleStop,
}

/// Payload carried by every registration and handed back on firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmEvent {
    pub channel: ChannelId,
    pub action: AlarmAction,
}

/// Owned capability for one time-source registration.
///
/// Neither `Clone` nor `Copy`: whoever holds the handle is the
/// only party that can re-enable or cancel the registration.  Re-arming a
/// slot means cancelling the old handle and storing the new one.
#[derive(Debug, PartialEq, Eq)]
pub struct ScheduleHandle {
    index: u8,
    generation: u16,
}

impl ScheduleHandle {
    /// Mint a handle.  Only time-source implementations should call this.
    pub const fn new(index: u8, generation: u16) -> Self {
        Self { index, generation }
    }

    pub const fn index(&self) -> u8 {
        self.index
    }

    pub const fn generation(&self) -> u16 {
        self.generation
    }
}

/// Recurring-event registry driven by wall-clock time.
///
/// New registrations start enabled.  A handle whose registration has
/// already been freed (a fired one-shot, or a stale generation) is ignored
/// by every method.
pub trait TimeSource {
    /// Register an event.  Returns `None` when the registry is full.
    fn schedule(&mut self, recurrence: Recurrence, event: AlarmEvent) -> Option<ScheduleHandle>;

    /// Suspend or resume a registration without freeing it.
    fn set_enabled(&mut self, handle: &ScheduleHandle, enabled: bool);

    /// Free a registration.
    fn cancel(&mut self, handle: ScheduleHandle);

    /// `true` while the registration exists and is enabled.
    fn is_armed(&self, handle: &ScheduleHandle) -> bool;

    /// The wall clock was set or resynchronised to `now` (epoch seconds).
    /// Pending registrations are re-anchored instead of firing for the
    /// skipped interval.
    fn set_now(&mut self, now: u64);
}

/// Receives alarm firings from the time source.
///
/// The firing time source is handed back so a handler can register
/// follow-up events (a Cycle start arms its duty timer).
pub trait AlarmDelegate {
    fn on_alarm(&mut self, event: AlarmEvent, timers: &mut dyn TimeSource);
}

// ───────────────────────────────────────────────────────────────
// Real-time clock (driven adapter: battery-backed RTC chip)
// ───────────────────────────────────────────────────────────────

pub trait RealTimeClock {
    /// Read the current calendar time.
    fn read(&mut self) -> Result<DateTime, RtcError>;

    /// Set the calendar time.
    fn write(&mut self, time: &DateTime) -> Result<(), RtcError>;
}

// ───────────────────────────────────────────────────────────────
// Output ports (domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Solid-state relay outputs (AC loads).
pub trait RelayPort {
    /// Drive a relay.  Repeating the current value is harmless.
    fn set_relay(&mut self, channel: ChannelId, on: bool);

    /// Last commanded state.
    fn relay(&self, channel: ChannelId) -> bool;

    /// Drive every relay to the same state.
    fn set_all_relays(&mut self, on: bool) {
        for channel in ChannelId::all() {
            self.set_relay(channel, on);
        }
    }
}

/// Opto-isolated DC outputs with pulse counting.
pub trait OptoPort {
    fn set_opto(&mut self, channel: ChannelId, on: bool);

    fn opto(&self, channel: ChannelId) -> bool;

    /// Pulses requested so far on `channel`.
    fn pulse_count(&self, channel: ChannelId) -> u16;

    /// Request `n` additional pulses on `channel`.
    fn request_pulses(&mut self, channel: ChannelId, n: u8);

    /// Pulse phase 1: raise every output that still owes pulses and count
    /// one pulse on each.
    fn begin_pulses(&mut self);

    /// Pulse phase 2: lower the raised outputs that have caught up.
    fn end_pulses(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Input ports (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// One-wire temperature probes.
pub trait TemperaturePort {
    /// Number of probes recognised on the bus.
    fn probe_count(&self) -> u8;

    fn is_recognized(&self, probe: ChannelId) -> bool;

    /// Last converted reading in °C.
    fn celsius(&self, probe: ChannelId) -> f32;

    /// Conversion phase 1: tell the probes to start converting.
    fn start_conversion(&mut self);

    /// Conversion phase 2: read the converted values back.
    fn finish_conversion(&mut self);
}

/// Averaged analog inputs.
pub trait AnalogPort {
    /// Take one sample on every input.
    fn sample(&mut self);

    /// Current averaged value.
    fn value(&self, input: InputId) -> f32;
}

/// Debounced push buttons.
///
/// The "latch" input is a maintained switch used for manual override;
/// the "trigger" is a momentary press that is consumed when read.
pub trait ButtonPort {
    /// Run one debounce step on every input.
    fn debounce(&mut self);

    /// Debounced state.
    fn state(&self, input: InputId) -> bool;

    /// Number of presses counted since boot.
    fn press_count(&self, input: InputId) -> u16;

    /// `true` while the manual-override latch is engaged.
    fn latch_engaged(&self) -> bool;

    /// Returns `true` once per press of the override trigger.
    fn take_trigger(&mut self) -> bool;
}

/// Network link status.  Association and roaming live behind this port.
pub trait NetworkPort {
    /// Link status word.  `3` means connected.
    fn status(&self) -> u16;

    fn is_connected(&self) -> bool {
        self.status() == NETWORK_CONNECTED
    }

    fn local_address(&self) -> [u8; 4];

    /// Received signal strength in dBm.
    fn signal_strength(&self) -> i32;

    /// Periodic connection check; reconnect when the link dropped.
    fn maintain(&mut self);
}

/// Status word reported while the link is up.
pub const NETWORK_CONNECTED: u16 = 3;

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The controller emits structured [`ControllerEvent`](super::events::ControllerEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ControllerEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`ControllerConfig`].
///
/// Implementations MUST call [`ControllerConfig::validate`] before
/// persisting and reject invalid values with
/// [`ConfigError::ValidationFailed`] rather than clamping them.
pub trait ConfigPort {
    /// Load configuration.  Returns [`ControllerConfig::default()`] when
    /// nothing has been stored yet.
    fn load(&self) -> Result<ControllerConfig, ConfigError>;

    fn save(&self, config: &ControllerConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`NonVolatileStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Offset at or beyond the store capacity.
    OutOfRange { offset: usize },
    /// The backing medium failed.
    Io,
}

/// Errors from [`RealTimeClock`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcError {
    /// The chip did not answer on the bus.
    NotResponding,
    /// The chip answered but its oscillator is stopped.
    Halted,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage.
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` names the field.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    Io,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { offset } => write!(f, "offset {offset} out of range"),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotResponding => write!(f, "RTC not responding"),
            Self::Halted => write!(f, "RTC oscillator halted"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

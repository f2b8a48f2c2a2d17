//! Outbound controller events.
//!
//! The [`Controller`](super::service::Controller) and the protocol
//! dispatcher emit these through the [`EventSink`](super::ports::EventSink)
//! port.  Adapters on the other side decide what to do with them.

use crate::alarm::engine::SlotOutcome;
use crate::alarm::types::{ScheduleMode, SlotKind};
use crate::app::ports::AlarmAction;
use crate::channel::ChannelId;
use crate::clock::DateTime;
use crate::error::{CommandError, FrameError};
use crate::protocol::transport::Interface;

/// Structured events emitted by the controller core.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    /// Start-up finished.  Carries whether the wall clock is trustworthy.
    Started { time_set: bool, master_enable: bool },

    /// A frame failed its checksum and was answered with NAK.
    FrameRejected { interface: Interface, error: FrameError },

    /// A payload did not decode or could not be served.
    CommandRejected { interface: Interface, error: CommandError },

    /// A client set the RTC.
    TimeSet(DateTime),

    /// An alarm slot was reconfigured.
    AlarmConfigured { channel: ChannelId, slot: SlotKind, outcome: SlotOutcome },

    /// A channel changed schedule mode.
    ModeSwapped { channel: ChannelId, mode: ScheduleMode },

    /// Master alarm enable changed.
    MasterEnableChanged { enabled: bool, persisted: bool },

    /// The persisted alarm table was wiped.
    StoreCleared { count: u16 },

    /// A timer fired and drove (or was blocked from driving) a relay.
    AlarmFired { channel: ChannelId, action: AlarmAction, applied: bool },

    /// OnOff outputs were resynchronised to their expected state.
    OutputsResynced,
}

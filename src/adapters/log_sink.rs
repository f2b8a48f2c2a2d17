//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events to the `log`
//! facade.  The simulator routes that to `tracing-subscriber`.

use log::{info, warn};

use crate::app::events::ControllerEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControllerEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControllerEvent) {
        match event {
            ControllerEvent::Started { time_set, master_enable } => {
                info!("START | time_set={} master_enable={}", time_set, master_enable);
            }
            ControllerEvent::FrameRejected { interface, error } => {
                warn!("FRAME | {} | {}", interface, error);
            }
            ControllerEvent::CommandRejected { interface, error } => {
                warn!("NAK   | {} | {}", interface, error);
            }
            ControllerEvent::TimeSet(time) => {
                info!("CLOCK | set to {}", time);
            }
            ControllerEvent::AlarmConfigured { channel, slot, outcome } => {
                info!("ALARM | ch{} {:?} slot -> {:?}", channel, slot, outcome);
            }
            ControllerEvent::ModeSwapped { channel, mode } => {
                info!("ALARM | ch{} mode -> {}", channel, mode);
            }
            ControllerEvent::MasterEnableChanged { enabled, persisted } => {
                info!("ALARM | master enable={} persisted={}", enabled, persisted);
            }
            ControllerEvent::StoreCleared { count } => {
                info!("STORE | cleared (count={})", count);
            }
            ControllerEvent::AlarmFired { channel, action, applied } => {
                info!(
                    "FIRE  | ch{} {:?} {}",
                    channel,
                    action,
                    if *applied { "applied" } else { "blocked" }
                );
            }
            ControllerEvent::OutputsResynced => {
                info!("RESYNC| on/off outputs follow their schedules");
            }
        }
    }
}

/// Sink that drops every event.
#[derive(Debug, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&mut self, _event: &ControllerEvent) {}
}

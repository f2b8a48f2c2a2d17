//! Alarm/timer engine.
//!
//! - [`types`]: channel schedule data model and validation rules.
//! - [`layout`]: non-volatile byte layout of the alarm table.
//! - [`engine`]: configure, arm, swap and evaluate schedules.

pub mod engine;
pub mod layout;
pub mod types;

pub use engine::{AlarmEngine, SlotConfig, SlotOutcome};
pub use types::{ScheduleMode, SlotKind, TimeOfDay};

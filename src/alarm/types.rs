//! Schedule value types and their validation rules.

use core::fmt;

use crate::app::ports::ScheduleHandle;

pub use crate::channel::ChannelId;

/// Seconds in one day.
pub const SECS_PER_DAY: u32 = 86_400;

/// Accepted cycle repeats per day.
pub const CYCLES_PER_DAY: core::ops::RangeInclusive<u32> = 1..=48;

/// Accepted duty duration in minutes.
pub const DUTY_MINUTES: core::ops::RangeInclusive<u32> = 1..=15;

// ═══════════════════════════════════════════════════════════════
//  Slot / mode enums
// ═══════════════════════════════════════════════════════════════

/// One of a channel's two alarm entries.
///
/// In OnOff mode the on-slot switches the output on and the off-slot
/// switches it off.  In Cycle mode the on-slot holds the period and the
/// off-slot holds the duty duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    On,
    Off,
}

impl SlotKind {
    /// Wire digit: `'1'` = on-slot, `'0'` = off-slot.
    pub fn from_ascii(byte: u8) -> Option<Self> {
        match byte {
            b'1' => Some(Self::On),
            b'0' => Some(Self::Off),
            _ => None,
        }
    }

    pub const BOTH: [Self; 2] = [Self::On, Self::Off];
}

/// Per-channel scheduling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ScheduleMode {
    /// On-slot is a period, off-slot is a duty duration.
    Cycle = 0,
    /// On-slot and off-slot are absolute times of day.
    OnOff = 1,
}

impl ScheduleMode {
    /// Decode a persisted mode byte.  Anything but `0` loads as OnOff.
    pub const fn from_byte(byte: u8) -> Self {
        if byte == 0 { Self::Cycle } else { Self::OnOff }
    }

    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    /// Wire digit: `'0'` = Cycle, `'1'` = OnOff.
    pub fn from_ascii(byte: u8) -> Option<Self> {
        match byte {
            b'0' => Some(Self::Cycle),
            b'1' => Some(Self::OnOff),
            _ => None,
        }
    }
}

impl fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cycle => write!(f, "cycle"),
            Self::OnOff => write!(f, "on/off"),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  TimeOfDay
// ═══════════════════════════════════════════════════════════════

/// Raw hour/minute/second triple as stored and transmitted.
///
/// Fields are not range-checked on construction: a slot may hold
/// `25:00:00` and simply be invalid.  In Cycle mode the triple is read as a
/// duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimeOfDay {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self::new(0, 0, 0);

    pub const fn new(hour: u8, minute: u8, second: u8) -> Self {
        Self { hour, minute, second }
    }

    /// Total seconds, reading the triple as a duration.
    pub const fn as_secs(self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60 + self.second as u32
    }

    /// Build from a second of the day.  Values past a day wrap.
    pub const fn from_secs(secs: u32) -> Self {
        let secs = secs % SECS_PER_DAY;
        Self::new((secs / 3600) as u8, ((secs / 60) % 60) as u8, (secs % 60) as u8)
    }

    /// Parse `HH:MM:SS`.  The separator bytes are not checked; each field
    /// must be two ASCII digits.
    pub fn parse(text: &[u8]) -> Option<Self> {
        if text.len() != 8 {
            return None;
        }
        Some(Self::new(
            two_digits(&text[0..2])?,
            two_digits(&text[3..5])?,
            two_digits(&text[6..8])?,
        ))
    }

    /// Range check for an absolute time of day.
    pub const fn is_clock_time(self) -> bool {
        self.hour <= 23 && self.minute <= 59 && self.second <= 59
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hour, self.minute, self.second)
    }
}

pub(crate) fn two_digits(pair: &[u8]) -> Option<u8> {
    match pair {
        [hi @ b'0'..=b'9', lo @ b'0'..=b'9'] => Some((hi - b'0') * 10 + (lo - b'0')),
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════
//  Validation and safe defaults
// ═══════════════════════════════════════════════════════════════

/// Whether `time` is acceptable for `slot` under `mode`.
pub fn is_valid(mode: ScheduleMode, slot: SlotKind, time: TimeOfDay) -> bool {
    match (mode, slot) {
        (ScheduleMode::OnOff, _) => time.is_clock_time(),
        (ScheduleMode::Cycle, SlotKind::On) => match time.as_secs() {
            0 => false,
            secs => CYCLES_PER_DAY.contains(&(SECS_PER_DAY / secs)),
        },
        (ScheduleMode::Cycle, SlotKind::Off) => DUTY_MINUTES.contains(&(time.as_secs() / 60)),
    }
}

/// Value a slot is reset to when it is disabled.
///
/// Cycle defaults are themselves invalid so a reset slot can never be
/// re-armed without a new configure.
pub const fn safe_default(mode: ScheduleMode, slot: SlotKind) -> TimeOfDay {
    match (mode, slot) {
        (ScheduleMode::OnOff, _) => TimeOfDay::MIDNIGHT,
        (ScheduleMode::Cycle, SlotKind::On) => TimeOfDay::new(0, 1, 0),
        (ScheduleMode::Cycle, SlotKind::Off) => TimeOfDay::new(23, 59, 59),
    }
}

// ═══════════════════════════════════════════════════════════════
//  AlarmSlot / ChannelSchedule
// ═══════════════════════════════════════════════════════════════

/// One alarm entry.  `valid` is derived and never persisted.
#[derive(Debug, Default)]
pub struct AlarmSlot {
    pub time: TimeOfDay,
    pub enabled: bool,
    pub valid: bool,
    pub(crate) handle: Option<ScheduleHandle>,
}

impl AlarmSlot {
    /// `true` when this slot may drive hardware.
    pub fn is_active(&self) -> bool {
        self.enabled && self.valid
    }

    /// `true` while a time-source registration is held for this slot.
    pub fn is_registered(&self) -> bool {
        self.handle.is_some()
    }
}

/// Both slots of one channel plus its mode.
#[derive(Debug)]
pub struct ChannelSchedule {
    pub mode: ScheduleMode,
    pub on: AlarmSlot,
    pub off: AlarmSlot,
}

impl ChannelSchedule {
    /// Both slots disabled at their safe defaults for `mode`.
    pub fn safe(mode: ScheduleMode) -> Self {
        let slot = |kind| AlarmSlot {
            time: safe_default(mode, kind),
            valid: is_valid(mode, kind, safe_default(mode, kind)),
            ..AlarmSlot::default()
        };
        Self { mode, on: slot(SlotKind::On), off: slot(SlotKind::Off) }
    }

    pub fn slot(&self, kind: SlotKind) -> &AlarmSlot {
        match kind {
            SlotKind::On => &self.on,
            SlotKind::Off => &self.off,
        }
    }

    pub fn slot_mut(&mut self, kind: SlotKind) -> &mut AlarmSlot {
        match kind {
            SlotKind::On => &mut self.on,
            SlotKind::Off => &mut self.off,
        }
    }

    /// Recompute both validity flags under the current mode.
    pub fn revalidate(&mut self) {
        for kind in SlotKind::BOTH {
            let mode = self.mode;
            let slot = self.slot_mut(kind);
            slot.valid = is_valid(mode, kind, slot.time);
        }
    }
}

//! Alarm engine: per-channel schedule state, persistence and arming.
//!
//! ```text
//!   Dispatcher ──configure / swap_mode──▶ AlarmEngine ──write──▶ NonVolatileStore
//!                                             │
//!                                             └──schedule / cancel──▶ TimeSource
//!   TimeSource ──AlarmEvent──▶ Controller ──expected_state / start_duty──▶ AlarmEngine
//! ```
//!
//! The engine never reports bad schedule data as an error.  A slot whose
//! value fails validation, or that is configured before the wall clock was
//! ever set, is reset to its safe default, disabled and persisted that way
//! ([`SlotOutcome::Disarmed`]).
//!
//! Collaborators are passed into each call rather than owned, so the engine
//! can be driven from the controller, the dispatcher and tests alike.

use log::{debug, info, warn};

use super::layout::{self, StoredSlot};
use super::types::{
    ChannelId, ChannelSchedule, SECS_PER_DAY, ScheduleMode, SlotKind, TimeOfDay, is_valid, safe_default,
};
use crate::app::ports::{
    AlarmAction, AlarmEvent, NonVolatileStore, Recurrence, RelayPort, StorageError, TimeSource,
};

/// Result of [`AlarmEngine::configure`].  Every variant is reported to the
/// client as success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotOutcome {
    /// Persisted and registered with the time source.
    Armed,
    /// Persisted without a live registration (slot disabled, or the Cycle
    /// duty slot which is armed at each cycle start).
    Stored,
    /// Rejected: reset to the safe default and disabled.
    Disarmed,
}

/// One alarm-set request as decoded from the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotConfig {
    pub channel: ChannelId,
    pub slot: SlotKind,
    /// Rule set named by the command (`SC` = OnOff, `ST` = Cycle).
    pub rules: ScheduleMode,
    pub time: TimeOfDay,
    pub enabled: bool,
}

pub struct AlarmEngine {
    channels: [ChannelSchedule; ChannelId::COUNT],
    master_enable: bool,
    clear_count: u16,
    expected_io_count: u16,
}

impl Default for AlarmEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmEngine {
    /// Every channel in OnOff mode with both slots disabled; master enable off.
    pub fn new() -> Self {
        Self {
            channels: core::array::from_fn(|_| ChannelSchedule::safe(ScheduleMode::OnOff)),
            master_enable: false,
            clear_count: 0,
            expected_io_count: 0,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn channel(&self, channel: ChannelId) -> &ChannelSchedule {
        &self.channels[channel.index()]
    }

    pub fn mode(&self, channel: ChannelId) -> ScheduleMode {
        self.channels[channel.index()].mode
    }

    pub fn master_enable(&self) -> bool {
        self.master_enable
    }

    /// Number of `clear_store` calls since boot (wrapping).
    pub fn clear_count(&self) -> u16 {
        self.clear_count
    }

    /// Number of client-requested output resyncs since boot (wrapping).
    pub fn expected_io_count(&self) -> u16 {
        self.expected_io_count
    }

    pub fn note_expected_io(&mut self) {
        self.expected_io_count = self.expected_io_count.wrapping_add(1);
    }

    // ── Master enable ─────────────────────────────────────────

    /// Change master enable in memory only (manual override).
    pub fn set_master_enable(&mut self, enabled: bool) {
        if self.master_enable != enabled {
            info!("alarm: master enable {}", if enabled { "on" } else { "off" });
        }
        self.master_enable = enabled;
    }

    /// Change master enable and persist it.
    pub fn store_master_enable(&mut self, enabled: bool, store: &mut dyn NonVolatileStore) {
        self.set_master_enable(enabled);
        persisted(layout::write_master_enable(store, enabled), "master enable");
    }

    // ── Startup ───────────────────────────────────────────────

    /// Replace the in-memory table with the persisted one.
    ///
    /// Existing registrations are cancelled; call [`arm_all`](Self::arm_all)
    /// afterwards.
    pub fn load(&mut self, store: &dyn NonVolatileStore, timers: &mut dyn TimeSource) {
        for channel in ChannelId::all() {
            let schedule = &mut self.channels[channel.index()];
            release(schedule, timers);
            *schedule = layout::load_channel(store, channel);
            debug!(
                "alarm: channel {channel} loaded ({}, on {} {}, off {} {})",
                schedule.mode,
                schedule.on.time,
                schedule.on.enabled,
                schedule.off.time,
                schedule.off.enabled,
            );
        }
        self.master_enable = layout::read_master_enable(store).unwrap_or_else(|e| {
            warn!("alarm: master enable unreadable ({e}), assuming off");
            false
        });
        info!("alarm: table loaded, master enable {}", self.master_enable);
    }

    /// Register every active slot with the time source.
    ///
    /// OnOff channels disable each invalid slot individually.  Cycle channels
    /// disable both slots when either is invalid, because a period without a
    /// valid duty (or the reverse) cannot run.  When the wall clock was never
    /// set every slot is disabled.
    pub fn arm_all(&mut self, time_set: bool, store: &mut dyn NonVolatileStore, timers: &mut dyn TimeSource) {
        for channel in ChannelId::all() {
            let schedule = &mut self.channels[channel.index()];
            match schedule.mode {
                ScheduleMode::OnOff => {
                    for kind in SlotKind::BOTH {
                        if !time_set || !schedule.slot(kind).valid {
                            disable(schedule, channel, kind, store);
                        }
                        rearm(schedule, channel, kind, timers);
                    }
                }
                ScheduleMode::Cycle => {
                    if !time_set || !schedule.on.valid || !schedule.off.valid {
                        disable(schedule, channel, SlotKind::On, store);
                        disable(schedule, channel, SlotKind::Off, store);
                    }
                    rearm(schedule, channel, SlotKind::On, timers);
                }
            }
        }
    }

    // ── Commands ──────────────────────────────────────────────

    /// Record, validate, persist and arm one slot.
    ///
    /// Validation uses the channel's current mode.  When the command names
    /// the other rule set, the value must satisfy both.
    pub fn configure(
        &mut self,
        request: SlotConfig,
        time_set: bool,
        store: &mut dyn NonVolatileStore,
        timers: &mut dyn TimeSource,
    ) -> SlotOutcome {
        let SlotConfig { channel, slot: kind, rules, time, enabled } = request;
        let schedule = &mut self.channels[channel.index()];
        let mode = schedule.mode;

        let valid = is_valid(mode, kind, time);
        let acceptable = time_set && valid && (rules == mode || is_valid(rules, kind, time));

        let slot = schedule.slot_mut(kind);
        slot.time = time;
        slot.enabled = enabled;
        slot.valid = valid;

        if !acceptable {
            warn!(
                "alarm: channel {channel} {kind:?} slot {time} rejected ({mode}, time set: {time_set}), disarming"
            );
            disable(schedule, channel, kind, store);
            cancel(schedule, kind, timers);
            return SlotOutcome::Disarmed;
        }

        persisted(layout::write_slot(store, channel, kind, StoredSlot { enabled, time }), "alarm slot");
        info!("alarm: channel {channel} {kind:?} slot set to {time} (enabled: {enabled})");

        if mode == ScheduleMode::Cycle && kind == SlotKind::Off {
            return SlotOutcome::Stored;
        }
        if rearm(schedule, channel, kind, timers) { SlotOutcome::Armed } else { SlotOutcome::Stored }
    }

    /// Switch a channel between OnOff and Cycle.  Returns `false` when the
    /// channel was already in `mode`.
    ///
    /// Outgoing registrations are suspended before any incoming one is
    /// armed, and freed afterwards, so the output is never driven by both
    /// modes at once.
    pub fn swap_mode(
        &mut self,
        channel: ChannelId,
        mode: ScheduleMode,
        store: &mut dyn NonVolatileStore,
        timers: &mut dyn TimeSource,
    ) -> bool {
        let schedule = &mut self.channels[channel.index()];
        if schedule.mode == mode {
            return false;
        }

        schedule.mode = mode;
        persisted(layout::write_mode(store, channel, mode), "alarm mode");

        let outgoing = [schedule.on.handle.take(), schedule.off.handle.take()];
        for handle in outgoing.iter().flatten() {
            timers.set_enabled(handle, false);
        }

        schedule.revalidate();
        if !schedule.on.valid || !schedule.off.valid {
            warn!("alarm: channel {channel} slots invalid as {mode}, disabling both");
            disable(schedule, channel, SlotKind::On, store);
            disable(schedule, channel, SlotKind::Off, store);
        }

        match mode {
            ScheduleMode::OnOff => {
                rearm(schedule, channel, SlotKind::On, timers);
                rearm(schedule, channel, SlotKind::Off, timers);
            }
            ScheduleMode::Cycle => {
                rearm(schedule, channel, SlotKind::On, timers);
            }
        }

        for handle in outgoing.into_iter().flatten() {
            timers.cancel(handle);
        }
        info!("alarm: channel {channel} now in {mode} mode");
        true
    }

    /// Wipe the persisted table.  The in-memory table is left as is.
    pub fn clear_store(&mut self, store: &mut dyn NonVolatileStore) {
        self.clear_count = self.clear_count.wrapping_add(1);
        persisted(layout::clear(store), "store clear");
        info!("alarm: store cleared ({} times since boot)", self.clear_count);
    }

    // ── Evaluation ────────────────────────────────────────────

    /// State the channel's output should hold at `second_of_day`.
    ///
    /// Only OnOff channels with both slots enabled and valid can be on.  An
    /// on-window with `on >= off` crosses midnight.
    pub fn expected_state(&self, channel: ChannelId, second_of_day: u32) -> bool {
        let schedule = &self.channels[channel.index()];
        if schedule.mode != ScheduleMode::OnOff || !schedule.on.is_active() || !schedule.off.is_active() {
            return false;
        }
        let on = schedule.on.time.as_secs();
        let off = schedule.off.time.as_secs();
        let now = second_of_day % SECS_PER_DAY;
        if on < off {
            on <= now && now < off
        } else {
            !(off <= now && now < on)
        }
    }

    /// Drive an OnOff channel's relay to `master_enable && expected_state`.
    /// Cycle channels are left alone.  Returns `true` when the relay was
    /// written.
    pub fn resync_output(&self, channel: ChannelId, second_of_day: u32, relays: &mut dyn RelayPort) -> bool {
        if self.mode(channel) != ScheduleMode::OnOff {
            return false;
        }
        let on = self.master_enable && self.expected_state(channel, second_of_day);
        debug!("alarm: channel {channel} resynced {}", if on { "on" } else { "off" });
        relays.set_relay(channel, on);
        true
    }

    /// [`resync_output`](Self::resync_output) for every channel.
    pub fn resync_all(&self, second_of_day: u32, relays: &mut dyn RelayPort) {
        for channel in ChannelId::all() {
            self.resync_output(channel, second_of_day, relays);
        }
    }

    // ── Cycle duty ────────────────────────────────────────────

    /// Arm the one-shot duty timer for a cycle that is starting.  Returns
    /// `true` when the duty timer is running and the output should go on.
    pub fn start_duty(&mut self, channel: ChannelId, timers: &mut dyn TimeSource) -> bool {
        let schedule = &mut self.channels[channel.index()];
        if schedule.mode != ScheduleMode::Cycle || !schedule.off.is_active() {
            return false;
        }
        cancel(schedule, SlotKind::Off, timers);
        let event = AlarmEvent { channel, action: AlarmAction::CycleStop };
        let delay_secs = schedule.off.time.as_secs();
        schedule.off.handle = timers.schedule(Recurrence::Once { delay_secs }, event);
        if schedule.off.handle.is_none() {
            warn!("alarm: channel {channel} duty timer not registered, registry full");
        }
        schedule.off.handle.is_some()
    }

    /// Forget the duty registration after its one-shot fired.
    pub fn finish_duty(&mut self, channel: ChannelId, timers: &mut dyn TimeSource) {
        cancel(&mut self.channels[channel.index()], SlotKind::Off, timers);
    }
}

// ═══════════════════════════════════════════════════════════════
//  Slot helpers
// ═══════════════════════════════════════════════════════════════

fn persisted(result: Result<(), StorageError>, what: &str) {
    if let Err(e) = result {
        warn!("alarm: failed to persist {what}: {e}");
    }
}

/// Reset a slot to its safe default, disabled, and persist both together.
fn disable(schedule: &mut ChannelSchedule, channel: ChannelId, kind: SlotKind, store: &mut dyn NonVolatileStore) {
    let mode = schedule.mode;
    let time = safe_default(mode, kind);
    let slot = schedule.slot_mut(kind);
    slot.time = time;
    slot.enabled = false;
    slot.valid = is_valid(mode, kind, time);
    persisted(layout::write_slot(store, channel, kind, StoredSlot { enabled: false, time }), "disabled slot");
}

fn cancel(schedule: &mut ChannelSchedule, kind: SlotKind, timers: &mut dyn TimeSource) {
    if let Some(handle) = schedule.slot_mut(kind).handle.take() {
        timers.cancel(handle);
    }
}

fn release(schedule: &mut ChannelSchedule, timers: &mut dyn TimeSource) {
    cancel(schedule, SlotKind::On, timers);
    cancel(schedule, SlotKind::Off, timers);
}

/// Replace a slot's registration.  Returns `true` when a new one is live.
fn rearm(schedule: &mut ChannelSchedule, channel: ChannelId, kind: SlotKind, timers: &mut dyn TimeSource) -> bool {
    cancel(schedule, kind, timers);
    let slot = schedule.slot(kind);
    if !slot.is_active() {
        return false;
    }
    let secs = slot.time.as_secs();
    let (recurrence, action) = match (schedule.mode, kind) {
        (ScheduleMode::OnOff, SlotKind::On) => (Recurrence::Daily { second_of_day: secs }, AlarmAction::SwitchOn),
        (ScheduleMode::OnOff, SlotKind::Off) => (Recurrence::Daily { second_of_day: secs }, AlarmAction::SwitchOff),
        (ScheduleMode::Cycle, SlotKind::On) => (Recurrence::Every { period_secs: secs }, AlarmAction::CycleStart),
        (ScheduleMode::Cycle, SlotKind::Off) => return false,
    };
    let handle = timers.schedule(recurrence, AlarmEvent { channel, action });
    if handle.is_none() {
        warn!("alarm: channel {channel} {kind:?} slot not registered, registry full");
    }
    let armed = handle.is_some();
    schedule.slot_mut(kind).handle = handle;
    armed
}

//! Alarm timer registry.
//!
//! The [`TimeSource`] the alarm engine registers with.  It keeps a fixed
//! table of registrations and is driven by wall-clock seconds: each
//! [`tick`](AlarmTimers::tick) fires everything that came due and hands
//! the events to an [`AlarmDelegate`].
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Registrations                           │
//! │                                                              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐         │
//! │  │ Daily       │   │ Every       │   │ Once        │         │
//! │  │ on/off slot │   │ cycle period│   │ cycle duty  │         │
//! │  └──────┬──────┘   └──────┬──────┘   └──────┬──────┘         │
//! │         │                 │                 │                │
//! │         ▼                 ▼                 ▼                │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │        AlarmTimers::tick(now) → AlarmDelegate          │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │              Controller drives the relay                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Times are seconds since the Unix epoch in local time, so the second of
//! the day is `now % 86400`.

use heapless::Vec;
use log::{debug, info, warn};

use crate::alarm::types::SECS_PER_DAY;
use crate::app::ports::{AlarmDelegate, AlarmEvent, Recurrence, ScheduleHandle, TimeSource};

// ═══════════════════════════════════════════════════════════════
//  Registry
// ═══════════════════════════════════════════════════════════════

/// Maximum concurrent registrations.  Four channels hold at most two each,
/// and a mode swap briefly holds both the outgoing and incoming pair.
pub const MAX_TIMERS: usize = 16;

#[derive(Debug, Clone, Copy)]
struct Timer {
    recurrence: Recurrence,
    event: AlarmEvent,
    enabled: bool,
    next_due: u64,
}

/// Fixed-capacity registry of wall-clock alarms.
pub struct AlarmTimers {
    timers: [Option<Timer>; MAX_TIMERS],
    generations: [u16; MAX_TIMERS],
    now: u64,
}

impl Default for AlarmTimers {
    fn default() -> Self {
        Self::new()
    }
}

impl AlarmTimers {
    pub fn new() -> Self {
        Self { timers: [None; MAX_TIMERS], generations: [0; MAX_TIMERS], now: 0 }
    }

    /// Current registry time.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Advance to `now` and fire every enabled registration that came due.
    ///
    /// Each registration fires at most once per tick, however far the clock
    /// jumped.  Events are delivered in due order.
    pub fn tick(&mut self, now: u64, delegate: &mut dyn AlarmDelegate) {
        self.now = now;
        let mut due: Vec<(u64, usize, AlarmEvent), MAX_TIMERS> = Vec::new();

        for (index, slot) in self.timers.iter_mut().enumerate() {
            let Some(timer) = slot else { continue };
            if !timer.enabled || timer.next_due > now {
                continue;
            }
            // Capacity equals table size, so this cannot overflow.
            let _ = due.push((timer.next_due, index, timer.event));
            let recurrence = timer.recurrence;
            match recurrence {
                Recurrence::Daily { second_of_day } => timer.next_due = next_daily(now, second_of_day),
                Recurrence::Every { period_secs } => {
                    let period = u64::from(period_secs.max(1));
                    let behind = (now - timer.next_due) / period + 1;
                    timer.next_due += behind * period;
                }
                Recurrence::Once { .. } => *slot = None,
            }
        }

        due.sort_unstable_by_key(|&(at, index, _)| (at, index));
        for (_, _, event) in due {
            debug!("timers: {:?} on channel {} fired", event.action, event.channel);
            delegate.on_alarm(event, self);
        }
    }

    /// Next due time of a live registration.
    pub fn next_due(&self, handle: &ScheduleHandle) -> Option<u64> {
        self.lookup(handle).map(|t| t.next_due)
    }

    /// Number of enabled registrations.
    pub fn armed_count(&self) -> usize {
        self.timers.iter().flatten().filter(|t| t.enabled).count()
    }

    fn lookup(&self, handle: &ScheduleHandle) -> Option<&Timer> {
        let index = usize::from(handle.index());
        if self.generations.get(index) != Some(&handle.generation()) {
            return None;
        }
        self.timers.get(index)?.as_ref()
    }

    fn lookup_mut(&mut self, handle: &ScheduleHandle) -> Option<&mut Timer> {
        let index = usize::from(handle.index());
        if self.generations.get(index) != Some(&handle.generation()) {
            return None;
        }
        self.timers.get_mut(index)?.as_mut()
    }
}

impl TimeSource for AlarmTimers {
    fn schedule(&mut self, recurrence: Recurrence, event: AlarmEvent) -> Option<ScheduleHandle> {
        let Some(index) = self.timers.iter().position(Option::is_none) else {
            warn!("timers: registry full, {:?} on channel {} dropped", event.action, event.channel);
            return None;
        };
        let next_due = match recurrence {
            Recurrence::Daily { second_of_day } => next_daily(self.now, second_of_day),
            Recurrence::Every { period_secs } => self.now + u64::from(period_secs.max(1)),
            Recurrence::Once { delay_secs } => self.now + u64::from(delay_secs),
        };
        self.timers[index] = Some(Timer { recurrence, event, enabled: true, next_due });
        self.generations[index] = self.generations[index].wrapping_add(1);
        info!(
            "timers: {:?} on channel {} registered at slot {index} ({recurrence:?})",
            event.action, event.channel
        );
        Some(ScheduleHandle::new(index as u8, self.generations[index]))
    }

    fn set_enabled(&mut self, handle: &ScheduleHandle, enabled: bool) {
        if let Some(timer) = self.lookup_mut(handle) {
            timer.enabled = enabled;
        }
    }

    fn cancel(&mut self, handle: ScheduleHandle) {
        if self.lookup(&handle).is_some() {
            self.timers[usize::from(handle.index())] = None;
            debug!("timers: slot {} freed", handle.index());
        }
    }

    fn is_armed(&self, handle: &ScheduleHandle) -> bool {
        self.lookup(handle).is_some_and(|t| t.enabled)
    }

    /// Daily registrations are re-anchored to the new day; relative ones
    /// keep their remaining delay.
    fn set_now(&mut self, now: u64) {
        let previous = self.now;
        for timer in self.timers.iter_mut().flatten() {
            timer.next_due = match timer.recurrence {
                Recurrence::Daily { second_of_day } => next_daily(now, second_of_day),
                Recurrence::Every { .. } | Recurrence::Once { .. } => {
                    now + timer.next_due.saturating_sub(previous)
                }
            };
        }
        if previous != now {
            debug!("timers: clock moved {previous} -> {now}");
        }
        self.now = now;
    }
}

/// First occurrence of `second_of_day` strictly after `now`.
fn next_daily(now: u64, second_of_day: u32) -> u64 {
    let day = u64::from(SECS_PER_DAY);
    let candidate = now - now % day + u64::from(second_of_day % SECS_PER_DAY);
    if candidate > now { candidate } else { candidate + day }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

//! Non-volatile byte layout of the alarm table.
//!
//! ```text
//!  channel n (0-based) occupies [9n, 9n+9):
//!  ┌────┬────┬────┬────┬─────┬────┬────┬────┬──────┐
//!  │ +0 │ +1 │ +2 │ +3 │ +4  │ +5 │ +6 │ +7 │ +8   │
//!  │ on │ H  │ M  │ S  │ off │ H  │ M  │ S  │ mode │
//!  │ en │    │    │    │ en  │    │    │    │      │
//!  └────┴────┴────┴────┴─────┴────┴────┴────┴──────┘
//!  byte 36: master alarm enable
//! ```

use log::warn;

use super::types::{ChannelId, ChannelSchedule, ScheduleMode, SlotKind, TimeOfDay};
use crate::app::ports::{NonVolatileStore, StorageError};

/// Bytes per channel.
pub const CHANNEL_STRIDE: usize = 9;

/// Offset of the master alarm enable byte.
pub const MASTER_ENABLE_OFFSET: usize = 36;

/// Highest offset written by the alarm table.
pub const LAST_OFFSET: usize = MASTER_ENABLE_OFFSET;

const MODE_FIELD: usize = 8;

/// Offset of a slot's enable byte.  The H/M/S bytes follow it.
pub const fn slot_offset(channel: ChannelId, slot: SlotKind) -> usize {
    let base = channel.index() * CHANNEL_STRIDE;
    match slot {
        SlotKind::On => base,
        SlotKind::Off => base + 4,
    }
}

pub const fn mode_offset(channel: ChannelId) -> usize {
    channel.index() * CHANNEL_STRIDE + MODE_FIELD
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// A slot as persisted: enable flag and raw time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredSlot {
    pub enabled: bool,
    pub time: TimeOfDay,
}

pub fn read_slot(
    store: &dyn NonVolatileStore,
    channel: ChannelId,
    slot: SlotKind,
) -> Result<StoredSlot, StorageError> {
    let at = slot_offset(channel, slot);
    Ok(StoredSlot {
        enabled: store.read_byte(at)? != 0,
        time: TimeOfDay::new(store.read_byte(at + 1)?, store.read_byte(at + 2)?, store.read_byte(at + 3)?),
    })
}

pub fn read_mode(store: &dyn NonVolatileStore, channel: ChannelId) -> Result<ScheduleMode, StorageError> {
    store.read_byte(mode_offset(channel)).map(ScheduleMode::from_byte)
}

pub fn read_master_enable(store: &dyn NonVolatileStore) -> Result<bool, StorageError> {
    store.read_byte(MASTER_ENABLE_OFFSET).map(|b| b != 0)
}

/// Load one channel.  Unreadable fields keep the safe defaults of the
/// channel's mode, disabled.
pub fn load_channel(store: &dyn NonVolatileStore, channel: ChannelId) -> ChannelSchedule {
    let mode = read_mode(store, channel).unwrap_or_else(|e| {
        warn!("alarm: channel {channel} mode unreadable ({e}), using on/off");
        ScheduleMode::OnOff
    });
    let mut schedule = ChannelSchedule::safe(mode);
    for kind in SlotKind::BOTH {
        match read_slot(store, channel, kind) {
            Ok(stored) => {
                let slot = schedule.slot_mut(kind);
                slot.enabled = stored.enabled;
                slot.time = stored.time;
            }
            Err(e) => warn!("alarm: channel {channel} {kind:?} slot unreadable ({e})"),
        }
    }
    schedule.revalidate();
    schedule
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Persist enable flag and time of a slot as one block.
pub fn write_slot(
    store: &mut dyn NonVolatileStore,
    channel: ChannelId,
    slot: SlotKind,
    stored: StoredSlot,
) -> Result<(), StorageError> {
    let t = stored.time;
    store.write_block(
        slot_offset(channel, slot),
        &[u8::from(stored.enabled), t.hour, t.minute, t.second],
    )
}

pub fn write_mode(
    store: &mut dyn NonVolatileStore,
    channel: ChannelId,
    mode: ScheduleMode,
) -> Result<(), StorageError> {
    store.write_byte(mode_offset(channel), mode.to_byte())
}

pub fn write_master_enable(store: &mut dyn NonVolatileStore, enabled: bool) -> Result<(), StorageError> {
    store.write_byte(MASTER_ENABLE_OFFSET, u8::from(enabled))
}

/// Zero every byte from offset 0 through [`LAST_OFFSET`].
pub fn clear(store: &mut dyn NonVolatileStore) -> Result<(), StorageError> {
    store.write_block(0, &[0; LAST_OFFSET + 1])
}

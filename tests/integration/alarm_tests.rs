//! Alarm scheduling through the whole controller: persisted tables,
//! protocol-driven configuration, timer firings and output recovery.

use homeauto::adapters::eeprom::MemoryEeprom;
use homeauto::alarm::layout::{self, StoredSlot, mode_offset, slot_offset};
use homeauto::alarm::types::{ScheduleMode, SlotKind, TimeOfDay};
use homeauto::app::events::ControllerEvent;
use homeauto::app::ports::AlarmAction;
use homeauto::channel::ChannelId;
use homeauto::clock::DateTime;
use homeauto::config::ControllerConfig;
use homeauto::protocol::codec::ACK;
use homeauto::protocol::crc::crc8;

use crate::mock_hw::{Board, ch};

fn board_at(h: u8, m: u8, s: u8) -> Board {
    Board::new(DateTime::new(2024, 3, 10, h, m, s))
}

fn persist_window(store: &mut MemoryEeprom, channel: ChannelId, on: TimeOfDay, off: TimeOfDay) {
    layout::write_mode(store, channel, ScheduleMode::OnOff).unwrap();
    layout::write_slot(store, channel, SlotKind::On, StoredSlot { enabled: true, time: on }).unwrap();
    layout::write_slot(store, channel, SlotKind::Off, StoredSlot { enabled: true, time: off }).unwrap();
}

fn fired(board: &Board, action: AlarmAction, applied: bool) -> usize {
    board.events.count(|e| {
        matches!(e, ControllerEvent::AlarmFired { action: a, applied: ok, .. } if *a == action && *ok == applied)
    })
}

// ── Recovery ──────────────────────────────────────────────────

#[test]
fn window_crossing_midnight_is_restored_then_closes() {
    let mut board = board_at(1, 59, 55);
    persist_window(&mut board.store, ch(1), TimeOfDay::new(22, 0, 0), TimeOfDay::new(2, 0, 0));
    layout::write_master_enable(&mut board.store, true).unwrap();
    let mut controller = board.start(&ControllerConfig::default());

    board.poll(&mut controller, 0);
    assert!(board.relays.calls_for(1).last() == Some(&true), "01:59:55 is inside 22:00-02:00");

    board.run(&mut controller, 1_000, 4_000, 1_000);
    assert_eq!(board.relays.calls_for(1).last(), Some(&true));

    board.poll(&mut controller, 5_000);
    assert_eq!(board.relays.calls_for(1).last(), Some(&false));
    assert_eq!(fired(&board, AlarmAction::SwitchOff, true), 1);
}

#[test]
fn window_crossing_midnight_is_on_before_midnight() {
    let mut board = board_at(23, 0, 0);
    persist_window(&mut board.store, ch(4), TimeOfDay::new(22, 0, 0), TimeOfDay::new(2, 0, 0));
    layout::write_master_enable(&mut board.store, true).unwrap();
    let mut controller = board.start(&ControllerConfig::default());

    board.poll(&mut controller, 0);
    assert_eq!(board.relays.calls_for(4), vec![true]);
}

#[test]
fn schedule_configured_over_serial_survives_restart() {
    let mut board = board_at(5, 0, 0);
    layout::write_mode(&mut board.store, ch(1), ScheduleMode::OnOff).unwrap();
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"ESM1", true);
    board.serial.request(b"ESC111 06:00:00", true);
    board.serial.request(b"ESC101 22:00:00", true);
    board.poll(&mut controller, 0);
    assert_eq!(board.serial.take_output(), vec![ACK, ACK, ACK]);
    assert_eq!(controller.timers().armed_count(), 2);
    drop(controller);

    board.rtc.set(DateTime::new(2024, 3, 11, 12, 0, 0));
    let mut controller = board.start(&ControllerConfig::default());
    assert!(controller.engine().master_enable());
    assert_eq!(controller.timers().armed_count(), 2);

    board.poll(&mut controller, 0);
    assert_eq!(board.relays.calls_for(1).last(), Some(&true));
}

// ── Firings ───────────────────────────────────────────────────

#[test]
fn daily_alarm_configured_over_serial_fires() {
    let mut board = board_at(6, 29, 58);
    layout::write_mode(&mut board.store, ch(1), ScheduleMode::OnOff).unwrap();
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"ESM1", true);
    board.serial.request(b"ESC111 06:30:00", true);
    board.serial.request(b"ESC101 06:30:03", true);
    board.poll(&mut controller, 0);
    board.poll(&mut controller, 1_000);
    assert_eq!(board.relays.calls_for(1).last(), Some(&false));

    board.poll(&mut controller, 2_000);
    assert_eq!(board.relays.calls_for(1).last(), Some(&true));

    board.run(&mut controller, 3_000, 5_000, 1_000);
    assert_eq!(board.relays.calls_for(1).last(), Some(&false));
    assert_eq!(fired(&board, AlarmAction::SwitchOn, true), 1);
    assert_eq!(fired(&board, AlarmAction::SwitchOff, true), 1);
}

#[test]
fn master_enable_off_blocks_firings() {
    let mut board = board_at(6, 29, 58);
    layout::write_mode(&mut board.store, ch(1), ScheduleMode::OnOff).unwrap();
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"ESC111 06:30:00", true);
    board.poll(&mut controller, 0);
    board.run(&mut controller, 1_000, 3_000, 1_000);

    assert!(!board.relays.calls_for(1).contains(&true));
    assert_eq!(fired(&board, AlarmAction::SwitchOn, false), 1);
}

#[test]
fn cycle_runs_its_duty_each_period() {
    let mut board = board_at(8, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());
    assert_eq!(controller.engine().mode(ch(2)), ScheduleMode::Cycle);

    board.serial.request(b"ESM1", true);
    board.serial.request(b"EST211 00:30:00", true);
    board.serial.request(b"EST201 00:01:00", true);
    board.poll(&mut controller, 0);
    assert_eq!(board.serial.take_output(), vec![ACK, ACK, ACK]);

    board.run(&mut controller, 1_000, 1_799_000, 1_000);
    assert!(!board.relays.calls_for(2).contains(&true));

    board.poll(&mut controller, 1_800_000);
    assert_eq!(board.relays.calls_for(2).last(), Some(&true));

    board.run(&mut controller, 1_801_000, 1_859_000, 1_000);
    assert_eq!(board.relays.calls_for(2).last(), Some(&true));

    board.poll(&mut controller, 1_860_000);
    assert_eq!(board.relays.calls_for(2).last(), Some(&false));
    assert_eq!(fired(&board, AlarmAction::CycleStart, true), 1);
    assert_eq!(fired(&board, AlarmAction::CycleStop, true), 1);
}

// ── Mode swaps ────────────────────────────────────────────────

#[test]
fn swapping_to_the_current_mode_changes_nothing() {
    let mut board = board_at(12, 0, 0);
    persist_window(&mut board.store, ch(2), TimeOfDay::new(6, 0, 0), TimeOfDay::new(22, 0, 0));
    layout::write_master_enable(&mut board.store, true).unwrap();
    let mut controller = board.start(&ControllerConfig::default());
    board.poll(&mut controller, 0);
    let before = board.store.bytes().to_vec();

    board.serial.request(b"ESO21", true);
    board.serial.request(b"ESO21", true);
    board.poll(&mut controller, 50);

    assert_eq!(board.serial.take_output(), vec![ACK, ACK]);
    assert_eq!(board.store.bytes(), &before[..]);
    assert_eq!(board.events.count(|e| matches!(e, ControllerEvent::ModeSwapped { .. })), 0);
    assert_eq!(board.relays.calls_for(2).last(), Some(&true));
    assert_eq!(controller.timers().armed_count(), 2);
}

#[test]
fn swapping_to_cycle_with_clock_times_disables_both_slots() {
    let mut board = board_at(12, 0, 0);
    persist_window(&mut board.store, ch(2), TimeOfDay::new(6, 0, 0), TimeOfDay::new(22, 0, 0));
    layout::write_master_enable(&mut board.store, true).unwrap();
    let mut controller = board.start(&ControllerConfig::default());
    board.poll(&mut controller, 0);

    board.serial.request(b"ESO20", true);
    board.poll(&mut controller, 50);

    assert_eq!(board.serial.take_output(), vec![ACK]);
    assert_eq!(board.events.count(|e| matches!(e, ControllerEvent::ModeSwapped { .. })), 1);
    assert_eq!(board.store.bytes()[mode_offset(ch(2))], 0);
    let on = slot_offset(ch(2), SlotKind::On);
    assert_eq!(&board.store.bytes()[on..on + 4], &[0, 0, 1, 0]);
    let off = slot_offset(ch(2), SlotKind::Off);
    assert_eq!(&board.store.bytes()[off..off + 4], &[0, 23, 59, 59]);
    assert_eq!(board.relays.calls_for(2).last(), Some(&false));
    assert_eq!(controller.timers().armed_count(), 0);
}

// ── Clock changes ─────────────────────────────────────────────

#[test]
fn time_jump_skips_missed_alarms_until_resync_requested() {
    let mut board = board_at(5, 0, 0);
    persist_window(&mut board.store, ch(1), TimeOfDay::new(6, 0, 0), TimeOfDay::new(22, 0, 0));
    layout::write_master_enable(&mut board.store, true).unwrap();
    let mut controller = board.start(&ControllerConfig::default());
    board.poll(&mut controller, 0);
    assert_eq!(board.relays.calls_for(1), vec![false]);

    board.serial.request(b"TSMar 10 2024 12:00:00", true);
    board.poll(&mut controller, 1_000);
    assert_eq!(board.serial.take_output(), vec![ACK]);
    assert_eq!(board.relays.calls_for(1), vec![false]);
    assert_eq!(fired(&board, AlarmAction::SwitchOn, true), 0);

    board.serial.request(b"ESXC1", true);
    board.serial.request(b"EGX", true);
    board.poll(&mut controller, 2_000);
    let mut expected = vec![ACK, ACK, 0, 1];
    expected.push(crc8(&[0, 1]));
    assert_eq!(board.serial.take_output(), expected);
    assert_eq!(board.relays.calls_for(1).last(), Some(&true));
}

//! Property tests for the frame codec, the schedule validation rules and
//! the calendar arithmetic.
//!
//! Host only; proptest is not built for bare-metal targets.

#![cfg(not(target_os = "none"))]

use homeauto::adapters::eeprom::MemoryEeprom;
use homeauto::alarm::engine::{AlarmEngine, SlotConfig, SlotOutcome};
use homeauto::alarm::layout::{self, StoredSlot, slot_offset};
use homeauto::alarm::types::{ScheduleMode, SlotKind, TimeOfDay, is_valid};
use homeauto::channel::ChannelId;
use homeauto::clock::DateTime;
use homeauto::protocol::codec::{END_MARKER, FrameDecoder, MAX_FRAME_LEN, Reply, encode_request, verify};
use homeauto::protocol::crc::crc8;
use homeauto::scheduler::AlarmTimers;
use proptest::prelude::*;

const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

fn mode() -> impl Strategy<Value = ScheduleMode> {
    prop_oneof![Just(ScheduleMode::OnOff), Just(ScheduleMode::Cycle)]
}

fn slot() -> impl Strategy<Value = SlotKind> {
    prop_oneof![Just(SlotKind::On), Just(SlotKind::Off)]
}

fn channel() -> impl Strategy<Value = ChannelId> {
    (1u8..=4).prop_map(|n| ChannelId::new(n).unwrap())
}

// ── Framing ───────────────────────────────────────────────────

proptest! {
    /// Any payload free of end markers survives encode → decode → verify,
    /// whatever its checksum byte happens to be.
    #[test]
    fn checksummed_request_decodes_to_its_payload(
        payload in proptest::collection::vec(any::<u8>().prop_filter("end marker", |b| *b != END_MARKER), 0..MAX_FRAME_LEN),
    ) {
        let wire = encode_request(&payload, true);
        let mut decoder = FrameDecoder::new(true);
        let mut frames = Vec::new();
        for &byte in wire.iter() {
            if let Some(frame) = decoder.push(byte) {
                frames.push(frame);
            }
        }
        frames.extend(decoder.finish_idle());

        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(verify(&frames[0], true), Ok(&payload[..]));
        prop_assert!(!decoder.in_progress());
    }

    /// Arbitrary input never yields an oversized frame.
    #[test]
    fn frames_never_exceed_the_receive_buffer(
        data in proptest::collection::vec(any::<u8>(), 0..256),
        lookahead in any::<bool>(),
    ) {
        let mut decoder = FrameDecoder::new(lookahead);
        for byte in data {
            if let Some(frame) = decoder.push(byte) {
                prop_assert!(frame.len() <= MAX_FRAME_LEN);
            }
        }
    }

    /// Reply checksums cover the data bytes only.
    #[test]
    fn data_reply_checksum_covers_data(data in proptest::collection::vec(any::<u8>(), 1..=10)) {
        let wire = Reply::bytes(&data).encode(true);
        prop_assert_eq!(wire.len(), data.len() + 2);
        prop_assert_eq!(&wire[1..=data.len()], &data[..]);
        prop_assert_eq!(wire[data.len() + 1], crc8(&data));
    }
}

// ── Schedules ─────────────────────────────────────────────────

proptest! {
    /// A value that fails the channel's rules never leaves an enabled or
    /// armed slot behind, in memory or in the store.
    #[test]
    fn invalid_value_never_enables_a_slot(
        channel in channel(),
        mode in mode(),
        rules in mode(),
        kind in slot(),
        (h, m, s) in (0u8..=99, 0u8..=99, 0u8..=99),
    ) {
        let time = TimeOfDay::new(h, m, s);
        let mut store = MemoryEeprom::new(64);
        layout::write_mode(&mut store, channel, mode).unwrap();
        let mut timers = AlarmTimers::new();
        let mut engine = AlarmEngine::new();
        engine.load(&store, &mut timers);

        let request = SlotConfig { channel, slot: kind, rules, time, enabled: true };
        let outcome = engine.configure(request, true, &mut store, &mut timers);

        let acceptable = is_valid(mode, kind, time) && is_valid(rules, kind, time);
        if acceptable {
            prop_assert_ne!(outcome, SlotOutcome::Disarmed);
        } else {
            prop_assert_eq!(outcome, SlotOutcome::Disarmed);
            prop_assert!(!engine.channel(channel).slot(kind).enabled);
            prop_assert_eq!(store.bytes()[slot_offset(channel, kind)], 0);
            prop_assert_eq!(timers.armed_count(), 0);
        }
    }

    /// A same-day window is on exactly between its on and off times.
    #[test]
    fn same_day_window_expected_state(
        channel in channel(),
        on in 0u32..86_399,
        len in 1u32..86_400,
        now in 0u32..86_400,
    ) {
        let off = (on + len).min(86_399);
        prop_assume!(on < off);
        let mut store = MemoryEeprom::new(64);
        layout::write_mode(&mut store, channel, ScheduleMode::OnOff).unwrap();
        layout::write_slot(&mut store, channel, SlotKind::On, StoredSlot { enabled: true, time: TimeOfDay::from_secs(on) }).unwrap();
        layout::write_slot(&mut store, channel, SlotKind::Off, StoredSlot { enabled: true, time: TimeOfDay::from_secs(off) }).unwrap();
        let mut timers = AlarmTimers::new();
        let mut engine = AlarmEngine::new();
        engine.load(&store, &mut timers);

        prop_assert_eq!(engine.expected_state(channel, now), on <= now && now < off);
    }
}

// ── Calendar ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn epoch_round_trip(
        year in 1970u16..=2099,
        month in 1u8..=12,
        day in 1u8..=31,
        (hour, minute, second) in (0u8..=23, 0u8..=59, 0u8..=59),
    ) {
        let Some(time) = DateTime::new(year, month, day, hour, minute, second) else {
            return Ok(());
        };
        prop_assert_eq!(DateTime::from_epoch(time.to_epoch()), time);
        prop_assert_eq!(time.to_epoch() % 86_400, u64::from(time.second_of_day()));
    }

    #[test]
    fn set_time_text_round_trip(
        year in 2000u16..=2099,
        month in 1u8..=12,
        day in 1u8..=28,
        (hour, minute, second) in (0u8..=23, 0u8..=59, 0u8..=59),
    ) {
        let date = format!("{} {:02} {:04}", MONTHS[usize::from(month - 1)], day, year);
        let clock = format!("{hour:02}:{minute:02}:{second:02}");
        prop_assert_eq!(
            DateTime::parse(date.as_bytes(), clock.as_bytes()),
            DateTime::new(year, month, day, hour, minute, second)
        );
    }
}

//! Command links end to end: bytes in on a scripted transport, through
//! the controller's run loop, replies and side effects out.

use homeauto::alarm::layout::{self, slot_offset};
use homeauto::alarm::types::{ScheduleMode, SlotKind};
use homeauto::app::events::ControllerEvent;
use homeauto::app::ports::OptoPort;
use homeauto::clock::DateTime;
use homeauto::config::ControllerConfig;
use homeauto::error::{CommandError, FrameError};
use homeauto::protocol::codec::{ACK, NAK, encode_request};
use homeauto::protocol::crc::crc8;
use homeauto::protocol::transport::Interface;

use crate::mock_hw::{Board, ch};

fn data_reply(data: &[u8]) -> Vec<u8> {
    let mut out = vec![ACK];
    out.extend_from_slice(data);
    out.push(crc8(data));
    out
}

fn board_at(h: u8, m: u8, s: u8) -> Board {
    Board::new(DateTime::new(2024, 3, 10, h, m, s))
}

// ── Serial link ───────────────────────────────────────────────

#[test]
fn set_time_then_read_it_back_over_serial() {
    let mut board = board_at(12, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"TSJun 05 2025 07:08:09", true);
    board.serial.request(b"TGT", true);
    board.serial.request(b"TGS", true);
    board.poll(&mut controller, 0);

    let mut expected = vec![ACK];
    expected.extend(data_reply(&[0x07, 0xE9, 6, 5, 7, 8, 9]));
    expected.extend(data_reply(&[1]));
    assert_eq!(board.serial.take_output(), expected);
    assert_eq!(board.rtc.time(), DateTime::new(2025, 6, 5, 7, 8, 9));
    assert_eq!(board.events.count(|e| matches!(e, ControllerEvent::TimeSet(_))), 1);
}

#[test]
fn request_split_across_reads_is_reassembled() {
    let mut board = board_at(12, 0, 0);
    board.serial = crate::mock_hw::ScriptedSerial::with_chunk(2);
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"CS21", true);
    board.run(&mut controller, 0, 200, 50);

    assert_eq!(board.serial.take_output(), vec![ACK]);
    assert_eq!(board.relays.calls_for(2).last(), Some(&true));
}

#[test]
fn checksum_byte_equal_to_end_marker_needs_one_lookahead() {
    let payload = b"ESC300 00:02:04";
    assert_eq!(crc8(payload), b']');

    let mut board = board_at(12, 0, 0);
    layout::write_mode(&mut board.store, ch(3), ScheduleMode::OnOff).unwrap();
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(payload, true);
    board.serial.request(b"EGC30", true);
    board.poll(&mut controller, 0);

    let mut expected = vec![ACK];
    expected.extend(data_reply(&[0, 0, 2, 4]));
    assert_eq!(board.serial.take_output(), expected);
    let at = slot_offset(ch(3), SlotKind::Off);
    assert_eq!(&board.store.bytes()[at..at + 4], &[0, 0, 2, 4]);
}

#[test]
fn corrupted_request_is_naked_and_not_executed() {
    let mut board = board_at(12, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());
    board.poll(&mut controller, 0);
    let relay_calls = board.relays.calls.len();

    let mut frame = encode_request(b"CS11", true).to_vec();
    let crc_at = frame.len() - 2;
    frame[crc_at] ^= 0x01;
    board.serial.send(&frame);
    board.poll(&mut controller, 50);

    assert_eq!(board.serial.take_output(), vec![NAK]);
    assert_eq!(board.relays.calls.len(), relay_calls);
    assert!(!controller.dispatcher().last_command_valid(Interface::Serial));
    assert_eq!(
        board.events.count(|e| matches!(
            e,
            ControllerEvent::FrameRejected { interface: Interface::Serial, error: FrameError::ChecksumMismatch { .. } }
        )),
        1
    );
}

#[test]
fn unknown_family_changes_nothing() {
    let mut board = board_at(12, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());
    board.poll(&mut controller, 0);
    let before = board.store.bytes().to_vec();
    let relay_calls = board.relays.calls.len();

    board.serial.request(b"ZS11", true);
    board.poll(&mut controller, 50);

    assert_eq!(board.serial.take_output(), vec![NAK]);
    assert_eq!(board.store.bytes(), &before[..]);
    assert_eq!(board.relays.calls.len(), relay_calls);
    assert_eq!(
        board.events.count(|e| matches!(
            e,
            ControllerEvent::CommandRejected { error: CommandError::UnknownFamily(b'Z'), .. }
        )),
        1
    );
}

#[test]
fn plain_frames_when_checksums_are_off() {
    let mut board = board_at(12, 0, 0);
    let config = ControllerConfig { rx_crc_enabled: false, tx_crc_enabled: false, ..ControllerConfig::default() };
    let mut controller = board.start(&config);

    board.serial.request(b"CS41", false);
    board.serial.request(b"CG4", false);
    board.poll(&mut controller, 0);

    assert_eq!(board.serial.take_output(), vec![ACK, ACK, 1]);
}

#[test]
fn opto_pulse_burst_holds_output_until_done() {
    let mut board = board_at(12, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"LS13", true);
    board.serial.request(b"LG1", true);
    board.poll(&mut controller, 0);
    let mut expected = vec![ACK];
    expected.extend(data_reply(&[0, 3]));
    assert_eq!(board.serial.take_output(), expected);

    board.run(&mut controller, 50, 1_000, 50);
    assert_eq!(board.optos.executed(ch(1)), 1);
    assert!(board.optos.opto(ch(1)));
    board.run(&mut controller, 1_050, 2_000, 50);
    assert_eq!(board.optos.executed(ch(1)), 3);
    assert!(board.optos.opto(ch(1)));
    board.run(&mut controller, 2_050, 2_500, 50);
    assert!(!board.optos.opto(ch(1)));
    assert!(!board.optos.opto(ch(2)));

    board.serial.request(b"LG1", true);
    board.poll(&mut controller, 2_550);
    assert_eq!(board.serial.take_output(), data_reply(&[0, 3]));
}

#[test]
fn clear_store_zeroes_only_the_alarm_table() {
    let mut board = board_at(12, 0, 0);
    board.store = homeauto::adapters::eeprom::MemoryEeprom::filled(64, 0xEE);
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"ESA", true);
    board.serial.request(b"ESA", true);
    board.serial.request(b"EGK", true);
    board.poll(&mut controller, 0);

    let mut expected = vec![ACK, ACK];
    expected.extend(data_reply(&[0, 2]));
    assert_eq!(board.serial.take_output(), expected);
    let bytes = board.store.bytes();
    assert!(bytes[..=layout::LAST_OFFSET].iter().all(|&b| b == 0));
    assert!(bytes[layout::LAST_OFFSET + 1..].iter().all(|&b| b == 0xEE));
}

// ── Network link ──────────────────────────────────────────────

#[test]
fn datagram_request_gets_datagram_reply() {
    let mut board = board_at(12, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());

    board.datagrams.send(&encode_request(b"WGS", true));
    board.datagrams.send(&encode_request(b"WGI", true));
    board.poll(&mut controller, 0);

    assert_eq!(board.datagrams.replies, vec![data_reply(&[0, 3]), data_reply(&[192, 168, 0, 20])]);
    assert!(board.serial.take_output().is_empty());
    assert!(controller.dispatcher().last_command_valid(Interface::Network));
}

#[test]
fn partial_datagram_does_not_leak_into_the_next() {
    let mut board = board_at(12, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());

    board.datagrams.send(b"[CS1");
    board.datagrams.send(&encode_request(b"CG1", true));
    board.poll(&mut controller, 0);

    assert_eq!(board.datagrams.replies, vec![data_reply(&[0])]);
}

#[test]
fn last_valid_flag_is_tracked_per_link() {
    let mut board = board_at(12, 0, 0);
    let mut controller = board.start(&ControllerConfig::default());

    board.serial.request(b"CG9", true);
    board.datagrams.send(&encode_request(b"CG1", true));
    board.poll(&mut controller, 0);

    assert!(!controller.dispatcher().last_command_valid(Interface::Serial));
    assert!(controller.dispatcher().last_command_valid(Interface::Network));
}

#[test]
fn disconnected_network_leaves_datagrams_queued() {
    let mut board = board_at(12, 0, 0);
    board.network = homeauto::adapters::sim::SimNetwork::disconnected();
    let mut controller = board.start(&ControllerConfig::default());

    board.datagrams.send(&encode_request(b"WGS", true));
    board.poll(&mut controller, 0);

    assert!(board.datagrams.replies.is_empty());
    assert_eq!(board.datagrams.pending(), 1);
}

//! Fuzz target: `Dispatcher::receive`
//!
//! Feeds arbitrary bytes through the full receive path (framing, checksum
//! gate, command decoding, execution) against in-memory adapters and
//! asserts that every reply is a well-formed ACK or NAK frame and that
//! nothing is written outside the alarm table.
//!
//! cargo fuzz run fuzz_dispatch

#![no_main]

use homeauto::adapters::eeprom::MemoryEeprom;
use homeauto::adapters::log_sink::NullEventSink;
use homeauto::adapters::sim::{SimAnalog, SimButtons, SimNetwork, SimPin, SimProbes};
use homeauto::adapters::time::FixedRtc;
use homeauto::alarm::engine::AlarmEngine;
use homeauto::alarm::layout::LAST_OFFSET;
use homeauto::clock::{Clock, DateTime};
use homeauto::drivers::{OptoBank, RelayBank};
use homeauto::protocol::codec::{ACK, MAX_REPLY_PAYLOAD, NAK};
use homeauto::protocol::dispatch::{DispatchContext, Dispatcher};
use homeauto::protocol::transport::Interface;
use homeauto::scheduler::AlarmTimers;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&flags, data)) = data.split_first() else { return };

    let mut engine = AlarmEngine::new();
    let mut timers = AlarmTimers::new();
    let mut clock = Clock::new();
    let mut store = MemoryEeprom::filled(64, 0xA5);
    let mut rtc = FixedRtc::new(DateTime::new(2024, 6, 1, 8, 0, 0));
    let mut relays = RelayBank::new(core::array::from_fn(|_| SimPin::new()));
    let mut optos = OptoBank::new(core::array::from_fn(|_| SimPin::new()));
    let probes = SimProbes::new();
    let analog = SimAnalog::new();
    let buttons = SimButtons::new();
    let network = SimNetwork::connected([10, 0, 0, 1], -55);
    let mut events = NullEventSink;

    clock.sync_from_rtc(&mut rtc, 0);

    let mut dispatcher = Dispatcher::new(flags & 1 != 0, flags & 2 != 0);
    let mut ctx = DispatchContext {
        engine: &mut engine,
        timers: &mut timers,
        clock: &mut clock,
        store: &mut store,
        rtc: &mut rtc,
        relays: &mut relays,
        optos: &mut optos,
        probes: &probes,
        analog: &analog,
        buttons: &buttons,
        network: &network,
        events: &mut events,
        uptime_ms: 1_000,
    };

    dispatcher.receive(Interface::Serial, data, true, &mut ctx, |reply| {
        assert!(!reply.is_empty());
        assert!(reply.len() <= MAX_REPLY_PAYLOAD + 2);
        match reply[0] {
            NAK => assert_eq!(reply.len(), 1, "NAK is never followed by data"),
            ACK => {}
            other => panic!("reply starts with 0x{other:02X}"),
        }
    });

    assert!(store.bytes()[LAST_OFFSET + 1..].iter().all(|&b| b == 0xA5));
});

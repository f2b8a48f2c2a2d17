//! Mock hardware for integration tests.
//!
//! Records every relay write and every controller event so tests can
//! assert on the full history, and scripts both command links.

use std::collections::VecDeque;

use homeauto::adapters::eeprom::MemoryEeprom;
use homeauto::adapters::sim::{SimAnalog, SimButtons, SimNetwork, SimPin, SimProbes};
use homeauto::adapters::time::FixedRtc;
use homeauto::app::events::ControllerEvent;
use homeauto::app::ports::{EventSink, RelayPort};
use homeauto::app::service::{Controller, Peripherals};
use homeauto::channel::ChannelId;
use homeauto::clock::DateTime;
use homeauto::config::ControllerConfig;
use homeauto::drivers::OptoBank;
use homeauto::protocol::codec::encode_request;
use homeauto::protocol::transport::{DatagramTransport, Transport};

// ── Relay call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCall {
    pub channel: u8,
    pub on: bool,
}

#[derive(Default)]
pub struct MockRelays {
    pub calls: Vec<RelayCall>,
    state: [bool; 4],
}

#[allow(dead_code)]
impl MockRelays {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls_for(&self, channel: u8) -> Vec<bool> {
        self.calls.iter().filter(|c| c.channel == channel).map(|c| c.on).collect()
    }
}

impl RelayPort for MockRelays {
    fn set_relay(&mut self, channel: ChannelId, on: bool) {
        self.calls.push(RelayCall { channel: channel.number(), on });
        self.state[channel.index()] = on;
    }

    fn relay(&self, channel: ChannelId) -> bool {
        self.state[channel.index()]
    }
}

// ── Event log ─────────────────────────────────────────────────

#[derive(Default)]
pub struct EventLog {
    pub events: Vec<ControllerEvent>,
}

#[allow(dead_code)]
impl EventLog {
    pub fn count(&self, pred: impl Fn(&ControllerEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: &ControllerEvent) {
        self.events.push(*event);
    }
}

// ── Scripted serial link ──────────────────────────────────────

/// Byte stream that hands out at most `chunk` bytes per read.
pub struct ScriptedSerial {
    inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
    chunk: usize,
}

#[allow(dead_code)]
impl ScriptedSerial {
    pub fn new() -> Self {
        Self { inbound: VecDeque::new(), outbound: Vec::new(), chunk: usize::MAX }
    }

    pub fn with_chunk(chunk: usize) -> Self {
        Self { chunk, ..Self::new() }
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.inbound.extend(bytes.iter().copied());
    }

    pub fn request(&mut self, payload: &[u8], checksum: bool) {
        self.send(&encode_request(payload, checksum));
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.outbound)
    }
}

impl Transport for ScriptedSerial {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let n = buf.len().min(self.chunk).min(self.inbound.len());
        for slot in &mut buf[..n] {
            *slot = self.inbound.pop_front().unwrap_or_default();
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, ()> {
        self.outbound.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), ()> {
        Ok(())
    }
}

// ── Scripted datagram link ────────────────────────────────────

#[derive(Default)]
pub struct ScriptedDatagrams {
    inbound: VecDeque<Vec<u8>>,
    pub replies: Vec<Vec<u8>>,
}

#[allow(dead_code)]
impl ScriptedDatagrams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn send(&mut self, datagram: &[u8]) {
        self.inbound.push_back(datagram.to_vec());
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }
}

impl DatagramTransport for ScriptedDatagrams {
    type Error = ();

    fn recv(&mut self, buf: &mut [u8]) -> Result<Option<usize>, ()> {
        let Some(datagram) = self.inbound.pop_front() else {
            return Ok(None);
        };
        let n = datagram.len().min(buf.len());
        buf[..n].copy_from_slice(&datagram[..n]);
        Ok(Some(n))
    }

    fn reply(&mut self, data: &[u8]) -> Result<(), ()> {
        self.replies.push(data.to_vec());
        Ok(())
    }
}

// ── Board ─────────────────────────────────────────────────────

/// Every collaborator of one controller, plus both links.
pub struct Board {
    pub store: MemoryEeprom,
    pub rtc: FixedRtc,
    pub relays: MockRelays,
    pub optos: OptoBank<SimPin>,
    pub probes: SimProbes,
    pub analog: SimAnalog,
    pub buttons: SimButtons,
    pub network: SimNetwork,
    pub events: EventLog,
    pub serial: ScriptedSerial,
    pub datagrams: ScriptedDatagrams,
}

#[allow(dead_code)]
impl Board {
    pub fn new(time: Option<DateTime>) -> Self {
        Self {
            store: MemoryEeprom::new(64),
            rtc: FixedRtc::new(time),
            relays: MockRelays::new(),
            optos: OptoBank::new(core::array::from_fn(|_| SimPin::new())),
            probes: SimProbes::new(),
            analog: SimAnalog::new(),
            buttons: SimButtons::new(),
            network: SimNetwork::connected([192, 168, 0, 20], -58),
            events: EventLog::default(),
            serial: ScriptedSerial::new(),
            datagrams: ScriptedDatagrams::new(),
        }
    }

    pub fn start(&mut self, config: &ControllerConfig) -> Controller {
        let mut controller = Controller::new(config);
        let (mut io, _, _) = self.split();
        controller.start(0, &mut io);
        controller
    }

    pub fn poll(&mut self, controller: &mut Controller, uptime_ms: u64) {
        let (mut io, serial, datagrams) = self.split();
        controller.poll(uptime_ms, &mut io, serial, datagrams);
    }

    /// Poll every `step_ms` from `from_ms` through `to_ms`.
    pub fn run(&mut self, controller: &mut Controller, from_ms: u64, to_ms: u64, step_ms: u64) {
        let mut t = from_ms;
        while t <= to_ms {
            self.poll(controller, t);
            t += step_ms;
        }
    }

    fn split(&mut self) -> (Peripherals<'_>, &mut ScriptedSerial, &mut ScriptedDatagrams) {
        (
            Peripherals {
                store: &mut self.store,
                rtc: &mut self.rtc,
                relays: &mut self.relays,
                optos: &mut self.optos,
                probes: &mut self.probes,
                analog: &mut self.analog,
                buttons: &mut self.buttons,
                network: &mut self.network,
                events: &mut self.events,
            },
            &mut self.serial,
            &mut self.datagrams,
        )
    }
}

pub fn ch(n: u8) -> ChannelId {
    ChannelId::new(n).unwrap()
}

//! Command dispatcher: checksum gate, command execution, reply production.
//!
//! ```text
//!  bytes ──▶ FrameDecoder[iface] ──▶ verify ──▶ Command::parse ──▶ run ──▶ Reply
//!                                      │              │               │
//!                                      └──── NAK ◀────┴───── NAK ◀────┘
//! ```
//!
//! Both interfaces share one dispatcher and one set of collaborators.  The
//! only per-interface state is the frame decoder and the "last command
//! valid" flag.
//!
//! Every rejection (bad checksum, unknown family, bad argument, hardware
//! fault) replies a lone NAK and leaves persisted and output state as it
//! was.

use heapless::Vec;
use log::{debug, info, warn};

use super::codec::{self, FrameDecoder, MAX_REPLY_PAYLOAD, Reply};
use super::command::Command;
use super::transport::Interface;
use crate::alarm::engine::AlarmEngine;
use crate::alarm::types::ScheduleMode;
use crate::app::events::ControllerEvent;
use crate::app::ports::{
    AnalogPort, ButtonPort, EventSink, NetworkPort, NonVolatileStore, OptoPort, RealTimeClock, RelayPort,
    TemperaturePort, TimeSource,
};
use crate::clock::Clock;
use crate::error::CommandError;

/// Encoded reply bytes.
pub type ReplyBytes = Vec<u8, { MAX_REPLY_PAYLOAD + 2 }>;

/// Everything a command may read or change, borrowed for one dispatch.
pub struct DispatchContext<'a> {
    pub engine: &'a mut AlarmEngine,
    pub timers: &'a mut dyn TimeSource,
    pub clock: &'a mut Clock,
    pub store: &'a mut dyn NonVolatileStore,
    pub rtc: &'a mut dyn RealTimeClock,
    pub relays: &'a mut dyn RelayPort,
    pub optos: &'a mut dyn OptoPort,
    pub probes: &'a dyn TemperaturePort,
    pub analog: &'a dyn AnalogPort,
    pub buttons: &'a dyn ButtonPort,
    pub network: &'a dyn NetworkPort,
    pub events: &'a mut dyn EventSink,
    pub uptime_ms: u64,
}

impl DispatchContext<'_> {
    fn second_of_day(&self) -> u32 {
        self.clock.system_time(self.uptime_ms).second_of_day()
    }

    fn wall_clock(&self) -> u64 {
        self.clock.now(self.uptime_ms)
    }
}

pub struct Dispatcher {
    rx_crc: bool,
    tx_crc: bool,
    decoders: [FrameDecoder; Interface::COUNT],
    last_valid: [bool; Interface::COUNT],
}

impl Dispatcher {
    pub fn new(rx_crc: bool, tx_crc: bool) -> Self {
        Self {
            rx_crc,
            tx_crc,
            decoders: core::array::from_fn(|_| FrameDecoder::new(rx_crc)),
            last_valid: [false; Interface::COUNT],
        }
    }

    pub fn rx_crc(&self) -> bool {
        self.rx_crc
    }

    pub fn tx_crc(&self) -> bool {
        self.tx_crc
    }

    /// Toggle inbound checksum checking.  The end-marker lookahead follows.
    pub fn set_rx_crc(&mut self, enabled: bool) {
        self.rx_crc = enabled;
        for decoder in &mut self.decoders {
            decoder.set_lookahead(enabled);
        }
    }

    pub fn set_tx_crc(&mut self, enabled: bool) {
        self.tx_crc = enabled;
    }

    /// Whether the most recent command on `interface` was accepted.
    pub fn last_command_valid(&self, interface: Interface) -> bool {
        self.last_valid[interface.index()]
    }

    /// Feed received bytes.  Each completed frame is handled and its
    /// encoded reply handed to `reply`.
    ///
    /// `end_of_input` marks a datagram boundary or an idle stream: a frame
    /// still waiting for its end-marker lookahead byte completes there.
    pub fn receive(
        &mut self,
        interface: Interface,
        data: &[u8],
        end_of_input: bool,
        ctx: &mut DispatchContext<'_>,
        mut reply: impl FnMut(&[u8]),
    ) {
        for &byte in data {
            if let Some(frame) = self.decoders[interface.index()].push(byte) {
                let out = self.handle_frame(interface, &frame, ctx);
                reply(&self.encode(&out));
            }
        }
        if end_of_input {
            if let Some(frame) = self.decoders[interface.index()].finish_idle() {
                let out = self.handle_frame(interface, &frame, ctx);
                reply(&self.encode(&out));
            }
        }
    }

    /// Drop a partially received frame (new datagram, link reset).
    pub fn reset(&mut self, interface: Interface) {
        self.decoders[interface.index()].reset();
    }

    /// Verify and execute one complete frame.
    pub fn handle_frame(&mut self, interface: Interface, frame: &[u8], ctx: &mut DispatchContext<'_>) -> Reply {
        match codec::verify(frame, self.rx_crc) {
            Ok(payload) => self.execute(interface, payload, ctx),
            Err(error) => {
                warn!("dispatch: {interface} frame rejected: {error}");
                self.last_valid[interface.index()] = false;
                ctx.events.emit(&ControllerEvent::FrameRejected { interface, error });
                Reply::Nak
            }
        }
    }

    /// Execute a verified payload.
    pub fn execute(&mut self, interface: Interface, payload: &[u8], ctx: &mut DispatchContext<'_>) -> Reply {
        self.last_valid[interface.index()] = true;
        let result = Command::parse(payload).and_then(|command| {
            if command.is_mutation() {
                info!("dispatch: {interface} applying {command:?}");
            } else {
                debug!("dispatch: {interface} {command:?}");
            }
            run(command, ctx)
        });
        match result {
            Ok(reply) => reply,
            Err(error) => {
                warn!("dispatch: {interface} command rejected: {error}");
                self.last_valid[interface.index()] = false;
                ctx.events.emit(&ControllerEvent::CommandRejected { interface, error });
                Reply::Nak
            }
        }
    }

    /// Wire bytes for `reply`, checksummed when outbound checksum is on.
    pub fn encode(&self, reply: &Reply) -> ReplyBytes {
        reply.encode(self.tx_crc)
    }
}

// ═══════════════════════════════════════════════════════════════
//  Command execution
// ═══════════════════════════════════════════════════════════════

fn run(command: Command, ctx: &mut DispatchContext<'_>) -> Result<Reply, CommandError> {
    let reply = match command {
        // ── Clock ──
        Command::GetSystemTime => Reply::bytes(&ctx.clock.system_time(ctx.uptime_ms).to_wire()),
        Command::GetRtcTime => {
            let time = ctx.clock.read_rtc(ctx.rtc).ok_or(CommandError::HardwareUnavailable)?;
            Reply::bytes(&time.to_wire())
        }
        Command::GetRtcConfigured => Reply::flag(ctx.clock.rtc_configured()),
        Command::GetParseFailure => Reply::flag(ctx.clock.parse_failure()),
        Command::GetTimeSet => Reply::flag(ctx.clock.time_set()),
        Command::SetTime { date, time } => {
            let set = ctx.clock.set_time(ctx.rtc, &date, &time, ctx.uptime_ms)?;
            let now = ctx.wall_clock();
            ctx.timers.set_now(now);
            ctx.events.emit(&ControllerEvent::TimeSet(set));
            Reply::Ack
        }

        // ── Alarm ──
        Command::GetAlarm { channel, slot } => {
            let slot = ctx.engine.channel(channel).slot(slot);
            let t = slot.time;
            Reply::bytes(&[u8::from(slot.enabled), t.hour, t.minute, t.second])
        }
        Command::GetMasterEnable => Reply::flag(ctx.engine.master_enable()),
        Command::GetClearCount => Reply::word(ctx.engine.clear_count()),
        Command::GetExpectedIoCount => Reply::word(ctx.engine.expected_io_count()),
        Command::GetMode { channel } => Reply::bytes(&[ctx.engine.mode(channel).to_byte()]),
        Command::ConfigureAlarm(request) => {
            let time_set = ctx.clock.time_set();
            let outcome = ctx.engine.configure(request, time_set, ctx.store, ctx.timers);
            ctx.relays.set_relay(request.channel, false);
            ctx.events.emit(&ControllerEvent::AlarmConfigured {
                channel: request.channel,
                slot: request.slot,
                outcome,
            });
            Reply::Ack
        }
        Command::SetMasterEnable(enabled) => {
            ctx.engine.store_master_enable(enabled, ctx.store);
            ctx.events.emit(&ControllerEvent::MasterEnableChanged { enabled, persisted: true });
            Reply::Ack
        }
        Command::ClearStore => {
            ctx.engine.clear_store(ctx.store);
            ctx.events.emit(&ControllerEvent::StoreCleared { count: ctx.engine.clear_count() });
            Reply::Ack
        }
        Command::ResyncOutput { channel } => {
            ctx.engine.note_expected_io();
            let second = ctx.second_of_day();
            ctx.engine.resync_output(channel, second, ctx.relays);
            Reply::Ack
        }
        Command::SwapMode { channel, mode } => {
            if ctx.engine.swap_mode(channel, mode, ctx.store, ctx.timers) {
                ctx.events.emit(&ControllerEvent::ModeSwapped { channel, mode });
            }
            match mode {
                ScheduleMode::OnOff => {
                    let second = ctx.second_of_day();
                    ctx.engine.resync_output(channel, second, ctx.relays);
                }
                ScheduleMode::Cycle => ctx.relays.set_relay(channel, false),
            }
            Reply::Ack
        }

        // ── Temperature ──
        Command::GetProbeCount => Reply::word(u16::from(ctx.probes.probe_count())),
        Command::GetProbeRecognized { probe } => Reply::flag(ctx.probes.is_recognized(probe)),
        Command::GetTemperature { probe } => Reply::float(ctx.probes.celsius(probe)),

        // ── Push-buttons ──
        Command::GetButtonState { input } => Reply::flag(ctx.buttons.state(input)),
        Command::GetButtonPresses { input } => Reply::word(ctx.buttons.press_count(input)),

        // ── Outputs ──
        Command::GetRelay { channel } => Reply::flag(ctx.relays.relay(channel)),
        Command::SetRelay { channel, on } => {
            ctx.relays.set_relay(channel, on);
            Reply::Ack
        }
        Command::GetOpto { channel } => Reply::flag(ctx.optos.opto(channel)),
        Command::SetOpto { channel, on } => {
            ctx.optos.set_opto(channel, on);
            Reply::Ack
        }
        Command::GetOptoPulses { channel } => Reply::word(ctx.optos.pulse_count(channel)),
        Command::AddOptoPulses { channel, count } => {
            ctx.optos.request_pulses(channel, count);
            Reply::Ack
        }

        // ── Analog ──
        Command::GetAnalog { input } => Reply::float(ctx.analog.value(input)),

        // ── Network ──
        Command::GetNetworkStatus => Reply::word(ctx.network.status()),
        Command::GetNetworkAddress => Reply::bytes(&ctx.network.local_address()),
        Command::GetSignalStrength => Reply::bytes(&ctx.network.signal_strength().to_be_bytes()),
    };
    Ok(reply)
}

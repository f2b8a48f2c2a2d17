//! Controller service: the hexagonal core.
//!
//! [`Controller`] owns the alarm engine, the alarm timers, the clock, the
//! protocol dispatcher and the two phased operations.  Everything else is
//! borrowed per call through [`Peripherals`] and the two transports, so the
//! whole controller runs against mock adapters in tests.
//!
//! ```text
//!  Transport ──────▶ ┌────────────────────────────────┐ ──▶ EventSink
//!  DatagramTransport │           Controller           │
//!                    │ Dispatcher · AlarmEngine ·     │ ──▶ RelayPort / OptoPort
//!  RealTimeClock ──▶ │ AlarmTimers · Clock · phases   │ ◀─▶ NonVolatileStore
//!                    └────────────────────────────────┘
//! ```
//!
//! The run loop is cooperative: [`poll`](Controller::poll) runs every
//! handler whose period elapsed, in a fixed order, and returns.  No handler
//! blocks.

use log::{debug, info, warn};

use crate::alarm::engine::AlarmEngine;
use crate::app::events::ControllerEvent;
use crate::app::ports::{
    AlarmAction, AlarmDelegate, AlarmEvent, AnalogPort, ButtonPort, EventSink, NetworkPort, NonVolatileStore,
    OptoPort, RealTimeClock, RelayPort, TemperaturePort, TimeSource,
};
use crate::clock::Clock;
use crate::config::ControllerConfig;
use crate::phase::{Phase, PhasedOperation};
use crate::protocol::codec::MAX_FRAME_LEN;
use crate::protocol::dispatch::{DispatchContext, Dispatcher};
use crate::protocol::transport::{DatagramTransport, Interface, Transport};
use crate::scheduler::AlarmTimers;

/// Largest datagram accepted in one receive.
const DATAGRAM_BUF: usize = 2 * MAX_FRAME_LEN;

/// Serial bytes moved per read call.
const SERIAL_CHUNK: usize = 64;

// ───────────────────────────────────────────────────────────────
// Collaborators
// ───────────────────────────────────────────────────────────────

/// Hardware and storage the controller drives, borrowed for one call.
pub struct Peripherals<'a> {
    pub store: &'a mut dyn NonVolatileStore,
    pub rtc: &'a mut dyn RealTimeClock,
    pub relays: &'a mut dyn RelayPort,
    pub optos: &'a mut dyn OptoPort,
    pub probes: &'a mut dyn TemperaturePort,
    pub analog: &'a mut dyn AnalogPort,
    pub buttons: &'a mut dyn ButtonPort,
    pub network: &'a mut dyn NetworkPort,
    pub events: &'a mut dyn EventSink,
}

// ───────────────────────────────────────────────────────────────
// Periodic handlers
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Periodic {
    period_ms: u64,
    next_ms: u64,
}

impl Periodic {
    /// Due on the first poll, then every `period_ms`.
    fn new(period_ms: u32) -> Self {
        Self { period_ms: u64::from(period_ms.max(1)), next_ms: 0 }
    }

    /// Starts one period from `now_ms`.
    fn deferred(period_ms: u32, now_ms: u64) -> Self {
        let mut p = Self::new(period_ms);
        p.next_ms = now_ms + p.period_ms;
        p
    }

    fn due(&mut self, now_ms: u64) -> bool {
        if now_ms < self.next_ms {
            return false;
        }
        self.next_ms = now_ms + self.period_ms;
        true
    }
}

struct Handlers {
    time_resync: Periodic,
    debounce: Periodic,
    analog: Periodic,
    serial: Periodic,
    connection: Periodic,
    datagram: Periodic,
    alarm_service: Periodic,
}

impl Handlers {
    fn new(config: &ControllerConfig) -> Self {
        Self {
            time_resync: Periodic::deferred(config.time_resync_ms, 0),
            debounce: Periodic::new(config.input_poll_ms),
            analog: Periodic::new(config.analog_poll_ms),
            serial: Periodic::new(config.serial_poll_ms),
            connection: Periodic::deferred(config.connection_check_ms, 0),
            datagram: Periodic::new(config.udp_poll_ms),
            alarm_service: Periodic::new(config.alarm_service_ms),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

pub struct Controller {
    engine: AlarmEngine,
    timers: AlarmTimers,
    clock: Clock,
    dispatcher: Dispatcher,
    temperature: PhasedOperation,
    opto_pulse: PhasedOperation,
    handlers: Handlers,
    first_service: bool,
}

impl Controller {
    /// Construct from configuration.  Call [`start`](Self::start) next.
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            engine: AlarmEngine::new(),
            timers: AlarmTimers::new(),
            clock: Clock::new(),
            dispatcher: Dispatcher::new(config.rx_crc_enabled, config.tx_crc_enabled),
            temperature: PhasedOperation::new(u64::from(config.temperature_conversion_ms)),
            opto_pulse: PhasedOperation::new(u64::from(config.opto_pulse_ms)),
            handlers: Handlers::new(config),
            first_service: true,
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn engine(&self) -> &AlarmEngine {
        &self.engine
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn timers(&self) -> &AlarmTimers {
        &self.timers
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Start-up sequence: system time from the RTC, alarm table from the
    /// store, every alarm armed, network checked.
    pub fn start(&mut self, uptime_ms: u64, io: &mut Peripherals<'_>) {
        if !self.clock.sync_from_rtc(io.rtc, uptime_ms) {
            warn!("controller: RTC unavailable, alarms stay disarmed until the time is set");
        }
        self.timers.set_now(self.clock.now(uptime_ms));

        self.engine.load(io.store, &mut self.timers);
        self.engine.arm_all(self.clock.time_set(), io.store, &mut self.timers);

        io.network.maintain();

        let time_set = self.clock.time_set();
        let master_enable = self.engine.master_enable();
        io.events.emit(&ControllerEvent::Started { time_set, master_enable });
        info!(
            "controller: started (time set: {time_set}, master enable: {master_enable}, {} timers armed)",
            self.timers.armed_count()
        );
    }

    // ── Run loop ──────────────────────────────────────────────

    /// Run every handler that is due at `uptime_ms`.
    pub fn poll<S, D>(&mut self, uptime_ms: u64, io: &mut Peripherals<'_>, serial: &mut S, datagram: &mut D)
    where
        S: Transport,
        D: DatagramTransport,
    {
        if self.handlers.time_resync.due(uptime_ms) && self.clock.sync_from_rtc(io.rtc, uptime_ms) {
            self.timers.set_now(self.clock.now(uptime_ms));
            debug!("controller: system time resynced from RTC");
        }

        if self.handlers.debounce.due(uptime_ms) {
            io.buttons.debounce();
        }

        if self.handlers.analog.due(uptime_ms) {
            io.analog.sample();
        }

        match self.temperature.poll(uptime_ms) {
            Some(Phase::Start) => io.probes.start_conversion(),
            Some(Phase::Finish) => io.probes.finish_conversion(),
            None => {}
        }

        match self.opto_pulse.poll(uptime_ms) {
            Some(Phase::Start) => io.optos.begin_pulses(),
            Some(Phase::Finish) => io.optos.end_pulses(),
            None => {}
        }

        if self.handlers.serial.due(uptime_ms) {
            self.service_serial(uptime_ms, io, serial);
        }

        if self.handlers.connection.due(uptime_ms) {
            io.network.maintain();
        }

        if self.handlers.datagram.due(uptime_ms) && io.network.is_connected() {
            self.service_datagrams(uptime_ms, io, datagram);
        }

        if self.handlers.alarm_service.due(uptime_ms) {
            self.service_override(uptime_ms, io);
        }

        let now = self.clock.now(uptime_ms);
        let mut firing = Firing { engine: &mut self.engine, relays: &mut *io.relays, events: &mut *io.events };
        self.timers.tick(now, &mut firing);
    }

    fn service_serial<S: Transport>(&mut self, uptime_ms: u64, io: &mut Peripherals<'_>, serial: &mut S) {
        let mut buf = [0u8; SERIAL_CHUNK];
        loop {
            let n = match serial.read(&mut buf) {
                Ok(n) => n,
                Err(e) => {
                    warn!("controller: serial read failed: {e:?}");
                    0
                }
            };
            let idle = n < buf.len();
            self.receive(Interface::Serial, &buf[..n], idle, uptime_ms, io, |reply| {
                if let Err(e) = serial.write(reply).and_then(|_| serial.flush()) {
                    warn!("controller: serial write failed: {e:?}");
                }
            });
            if idle {
                break;
            }
        }
    }

    fn service_datagrams<D: DatagramTransport>(&mut self, uptime_ms: u64, io: &mut Peripherals<'_>, datagram: &mut D) {
        let mut buf = [0u8; DATAGRAM_BUF];
        loop {
            let n = match datagram.recv(&mut buf) {
                Ok(Some(n)) => n,
                Ok(None) => break,
                Err(e) => {
                    warn!("controller: datagram receive failed: {e:?}");
                    break;
                }
            };
            self.dispatcher.reset(Interface::Network);
            self.receive(Interface::Network, &buf[..n], true, uptime_ms, io, |reply| {
                if let Err(e) = datagram.reply(reply) {
                    warn!("controller: datagram reply failed: {e:?}");
                }
            });
        }
    }

    /// Hand bytes to the dispatcher with the controller's state borrowed in.
    fn receive(
        &mut self,
        interface: Interface,
        data: &[u8],
        end_of_input: bool,
        uptime_ms: u64,
        io: &mut Peripherals<'_>,
        reply: impl FnMut(&[u8]),
    ) {
        let mut ctx = DispatchContext {
            engine: &mut self.engine,
            timers: &mut self.timers,
            clock: &mut self.clock,
            store: &mut *io.store,
            rtc: &mut *io.rtc,
            relays: &mut *io.relays,
            optos: &mut *io.optos,
            probes: &*io.probes,
            analog: &*io.analog,
            buttons: &*io.buttons,
            network: &*io.network,
            events: &mut *io.events,
            uptime_ms,
        };
        self.dispatcher.receive(interface, data, end_of_input, &mut ctx, reply);
    }

    /// Manual override.
    ///
    /// First pass: with the latch released, outputs are resynchronised to
    /// their schedules; with it engaged, master enable is cleared.  Later
    /// passes act on a trigger press: released latch re-enables and
    /// resynchronises, engaged latch forces every relay off.
    fn service_override(&mut self, uptime_ms: u64, io: &mut Peripherals<'_>) {
        let second_of_day = self.clock.system_time(uptime_ms).second_of_day();
        let latch = io.buttons.latch_engaged();

        if core::mem::take(&mut self.first_service) {
            if latch {
                self.engine.set_master_enable(false);
                io.events.emit(&ControllerEvent::MasterEnableChanged { enabled: false, persisted: false });
            } else {
                self.engine.resync_all(second_of_day, io.relays);
                io.events.emit(&ControllerEvent::OutputsResynced);
            }
            return;
        }

        if !io.buttons.take_trigger() {
            return;
        }
        if latch {
            info!("controller: manual override, all relays off");
            io.relays.set_all_relays(false);
            self.engine.set_master_enable(false);
            io.events.emit(&ControllerEvent::MasterEnableChanged { enabled: false, persisted: false });
        } else {
            info!("controller: manual override released, alarms resume");
            self.engine.set_master_enable(true);
            self.engine.resync_all(second_of_day, io.relays);
            io.events.emit(&ControllerEvent::MasterEnableChanged { enabled: true, persisted: false });
            io.events.emit(&ControllerEvent::OutputsResynced);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Alarm firing
// ───────────────────────────────────────────────────────────────

/// Applies timer firings to the relays, gated by master enable.
struct Firing<'a> {
    engine: &'a mut AlarmEngine,
    relays: &'a mut dyn RelayPort,
    events: &'a mut dyn EventSink,
}

impl AlarmDelegate for Firing<'_> {
    fn on_alarm(&mut self, event: AlarmEvent, timers: &mut dyn TimeSource) {
        let AlarmEvent { channel, action } = event;
        let master = self.engine.master_enable();
        let applied = match action {
            AlarmAction::SwitchOn | AlarmAction::SwitchOff => {
                if master {
                    self.relays.set_relay(channel, action == AlarmAction::SwitchOn);
                }
                master
            }
            AlarmAction::CycleStart => {
                let started = master && self.engine.start_duty(channel, timers);
                if started {
                    self.relays.set_relay(channel, true);
                }
                started
            }
            AlarmAction::CycleStop => {
                self.engine.finish_duty(channel, timers);
                if master {
                    self.relays.set_relay(channel, false);
                }
                master
            }
        };
        if !applied {
            debug!("controller: {action:?} on channel {channel} blocked");
        }
        self.events.emit(&ControllerEvent::AlarmFired { channel, action, applied });
    }
}

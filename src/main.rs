//! HomeAuto host simulator: main entry point.
//!
//! Runs the controller core on the host against simulated hardware.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  StdioSerial     UdpTransport     FileEeprom     HostRtc       │
//! │  (Transport)     (Datagram)       (NV store)     (RTC)         │
//! │  RelayBank/OptoBank over SimPin   Sim sensors    LogEventSink  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              Controller (pure logic)                   │    │
//! │  │  Dispatcher · AlarmEngine · AlarmTimers · Clock        │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Requests arrive on stdin and replies go to stdout; logs go to stderr.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use homeauto::adapters::config_store::FileConfigStore;
use homeauto::adapters::eeprom::{DEFAULT_CAPACITY, FileEeprom};
use homeauto::adapters::log_sink::LogEventSink;
use homeauto::adapters::serial::StdioSerial;
use homeauto::adapters::sim::{SimAnalog, SimButtons, SimNetwork, SimPin, SimProbes};
use homeauto::adapters::time::{HostRtc, Uptime};
use homeauto::adapters::udp::UdpTransport;
use homeauto::app::ports::ConfigPort;
use homeauto::app::service::{Controller, Peripherals};
use homeauto::drivers::{OptoBank, RelayBank};

#[derive(Parser)]
#[command(name = "homeauto-sim", version)]
#[command(about = "Run the HomeAuto controller against simulated hardware", long_about = None)]
struct Args {
    /// EEPROM image file (created erased when missing)
    #[arg(long, default_value = "homeauto.eeprom")]
    eeprom: PathBuf,

    /// Configuration file (postcard blob or JSON); defaults when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Datagram listen port (overrides the config file)
    #[arg(long)]
    udp_port: Option<u16>,

    /// Inbound frames carry no checksum byte
    #[arg(long)]
    no_rx_crc: bool,

    /// Get replies carry no checksum byte
    #[arg(long)]
    no_tx_crc: bool,

    /// Run-loop period in milliseconds
    #[arg(long, default_value_t = 10)]
    tick_ms: u64,

    /// Stop once stdin is closed
    #[arg(long)]
    exit_on_eof: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    info!("╔══════════════════════════════════════╗");
    info!("║  HomeAuto sim v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 1. Configuration ──────────────────────────────────────
    let mut config = match &args.config {
        Some(path) => FileConfigStore::new(path)
            .load()
            .map_err(homeauto::Error::from)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => homeauto::config::ControllerConfig::default(),
    };
    if let Some(port) = args.udp_port {
        config.udp_port = port;
    }
    config.rx_crc_enabled &= !args.no_rx_crc;
    config.tx_crc_enabled &= !args.no_tx_crc;
    config.validate().map_err(homeauto::Error::from)?;
    info!(
        "config: rx crc {}, tx crc {}, udp port {}",
        config.rx_crc_enabled, config.tx_crc_enabled, config.udp_port
    );

    // ── 2. Adapters ───────────────────────────────────────────
    let mut store = FileEeprom::open(&args.eeprom, DEFAULT_CAPACITY)
        .map_err(homeauto::Error::from)
        .with_context(|| format!("opening EEPROM image {}", args.eeprom.display()))?;
    let mut rtc = HostRtc::new();
    let mut relays = RelayBank::new(core::array::from_fn(|_| SimPin::new()));
    let mut optos = OptoBank::new(core::array::from_fn(|_| SimPin::new()));
    let mut probes = SimProbes::new();
    let mut analog = SimAnalog::new();
    let mut buttons = SimButtons::new();
    let mut network = SimNetwork::connected([127, 0, 0, 1], -40);
    let mut events = LogEventSink::new();

    let mut serial = StdioSerial::spawn();
    let mut datagram =
        UdpTransport::bind(config.udp_port).with_context(|| format!("binding UDP port {}", config.udp_port))?;

    let mut io = Peripherals {
        store: &mut store,
        rtc: &mut rtc,
        relays: &mut relays,
        optos: &mut optos,
        probes: &mut probes,
        analog: &mut analog,
        buttons: &mut buttons,
        network: &mut network,
        events: &mut events,
    };

    // ── 3. Controller ─────────────────────────────────────────
    let uptime = Uptime::new();
    let mut controller = Controller::new(&config);
    controller.start(uptime.millis(), &mut io);

    let tick = Duration::from_millis(args.tick_ms.max(1));
    loop {
        controller.poll(uptime.millis(), &mut io, &mut serial, &mut datagram);
        if args.exit_on_eof && serial.is_closed() {
            info!("stdin closed, exiting");
            return Ok(());
        }
        thread::sleep(tick);
    }
}

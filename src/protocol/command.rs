//! Typed command records decoded from frame payloads.
//!
//! ```text
//!  byte 0   family      T E K P I C D L A W
//!  byte 1   operation   G(et) / S(et)
//!  byte 2.. arguments   channel digit, '0'/'1' flags, inline time strings
//! ```
//!
//! Decoding is pure: nothing here touches state, so a payload that fails
//! to decode leaves the controller exactly as it was.  Fixed-length
//! commands (`TS`, `ESC`, `EST`) must match their length exactly; the
//! others only need their argument bytes present.

use crate::alarm::engine::SlotConfig;
use crate::alarm::types::{ScheduleMode, SlotKind, TimeOfDay};
use crate::channel::{ChannelId, InputId, IoIndex};
use crate::error::CommandError;

/// `TS` payload length: `TS` + `Mmm dd yyyy` + separator + `hh:mm:ss`.
pub const SET_TIME_LEN: usize = 22;

/// `ESC` / `EST` payload length: `ES?` + channel + slot + enable +
/// separator + `hh:mm:ss`.
pub const SET_ALARM_LEN: usize = 15;

/// Largest pulse increment accepted by `LS`.
pub const MAX_PULSE_INCREMENT: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    // ── T: clock ──────────────────────────────────────────────
    GetSystemTime,
    GetRtcTime,
    GetRtcConfigured,
    GetParseFailure,
    GetTimeSet,
    SetTime { date: [u8; 11], time: [u8; 8] },

    // ── E: alarms ─────────────────────────────────────────────
    GetAlarm { channel: ChannelId, slot: SlotKind },
    GetMasterEnable,
    GetClearCount,
    GetExpectedIoCount,
    GetMode { channel: ChannelId },
    ConfigureAlarm(SlotConfig),
    SetMasterEnable(bool),
    ClearStore,
    ResyncOutput { channel: ChannelId },
    SwapMode { channel: ChannelId, mode: ScheduleMode },

    // ── K: temperature probes ─────────────────────────────────
    GetProbeCount,
    GetProbeRecognized { probe: ChannelId },
    GetTemperature { probe: ChannelId },

    // ── P / I: push buttons ───────────────────────────────────
    GetButtonState { input: InputId },
    GetButtonPresses { input: InputId },

    // ── C / D / L: outputs ────────────────────────────────────
    GetRelay { channel: ChannelId },
    SetRelay { channel: ChannelId, on: bool },
    GetOpto { channel: ChannelId },
    SetOpto { channel: ChannelId, on: bool },
    GetOptoPulses { channel: ChannelId },
    AddOptoPulses { channel: ChannelId, count: u8 },

    // ── A: analog probes ──────────────────────────────────────
    GetAnalog { input: InputId },

    // ── W: network ────────────────────────────────────────────
    GetNetworkStatus,
    GetNetworkAddress,
    GetSignalStrength,
}

impl Command {
    /// Decode a verified payload.
    pub fn parse(payload: &[u8]) -> Result<Self, CommandError> {
        let args = Args(payload);
        let family = args.byte(0)?;
        match family {
            b'T' => parse_clock(args),
            b'E' => parse_alarm(args),
            b'K' => match (args.byte(1)?, args.byte(2)?) {
                (b'G', b'N') => Ok(Self::GetProbeCount),
                (b'G', b'R') => Ok(Self::GetProbeRecognized { probe: args.id(3)? }),
                (b'G', b'C') => Ok(Self::GetTemperature { probe: args.id(3)? }),
                _ => Err(CommandError::UnknownOperation),
            },
            b'P' => match args.byte(1)? {
                b'G' => Ok(Self::GetButtonState { input: args.id(2)? }),
                _ => Err(CommandError::UnknownOperation),
            },
            b'I' => match args.byte(1)? {
                b'G' => Ok(Self::GetButtonPresses { input: args.id(2)? }),
                _ => Err(CommandError::UnknownOperation),
            },
            b'C' => match args.byte(1)? {
                b'G' => Ok(Self::GetRelay { channel: args.id(2)? }),
                b'S' => Ok(Self::SetRelay { channel: args.id(2)?, on: args.flag(3)? }),
                _ => Err(CommandError::UnknownOperation),
            },
            b'D' => match args.byte(1)? {
                b'G' => Ok(Self::GetOpto { channel: args.id(2)? }),
                b'S' => Ok(Self::SetOpto { channel: args.id(2)?, on: args.flag(3)? }),
                _ => Err(CommandError::UnknownOperation),
            },
            b'L' => match args.byte(1)? {
                b'G' => Ok(Self::GetOptoPulses { channel: args.id(2)? }),
                b'S' => {
                    let channel = args.id(2)?;
                    let count = args.byte(3)?.wrapping_sub(b'0');
                    if !(1..=MAX_PULSE_INCREMENT).contains(&count) {
                        return Err(CommandError::BadArgument);
                    }
                    Ok(Self::AddOptoPulses { channel, count })
                }
                _ => Err(CommandError::UnknownOperation),
            },
            b'A' => match (args.byte(1)?, args.byte(2)?) {
                (b'G', b'R') => Ok(Self::GetAnalog { input: args.id(3)? }),
                _ => Err(CommandError::UnknownOperation),
            },
            b'W' => match (args.byte(1)?, args.byte(2)?) {
                (b'G', b'S') => Ok(Self::GetNetworkStatus),
                (b'G', b'I') => Ok(Self::GetNetworkAddress),
                (b'G', b'T') => Ok(Self::GetSignalStrength),
                _ => Err(CommandError::UnknownOperation),
            },
            other => Err(CommandError::UnknownFamily(other)),
        }
    }

    /// `true` for commands that change persisted state or outputs.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::SetTime { .. }
                | Self::ConfigureAlarm(_)
                | Self::SetMasterEnable(_)
                | Self::ClearStore
                | Self::ResyncOutput { .. }
                | Self::SwapMode { .. }
                | Self::SetRelay { .. }
                | Self::SetOpto { .. }
                | Self::AddOptoPulses { .. }
        )
    }
}

fn parse_clock(args: Args<'_>) -> Result<Command, CommandError> {
    match args.byte(1)? {
        b'G' => match args.byte(2)? {
            b'T' => Ok(Command::GetSystemTime),
            b'R' => Ok(Command::GetRtcTime),
            b'C' => Ok(Command::GetRtcConfigured),
            b'P' => Ok(Command::GetParseFailure),
            b'S' => Ok(Command::GetTimeSet),
            _ => Err(CommandError::UnknownOperation),
        },
        b'S' => {
            let payload = args.exact(SET_TIME_LEN)?;
            let mut date = [0; 11];
            let mut time = [0; 8];
            date.copy_from_slice(&payload[2..13]);
            time.copy_from_slice(&payload[14..22]);
            Ok(Command::SetTime { date, time })
        }
        _ => Err(CommandError::UnknownOperation),
    }
}

fn parse_alarm(args: Args<'_>) -> Result<Command, CommandError> {
    match (args.byte(1)?, args.byte(2)?) {
        (b'G', b'C') => Ok(Command::GetAlarm { channel: args.id(3)?, slot: args.slot(4)? }),
        (b'G', b'M') => Ok(Command::GetMasterEnable),
        (b'G', b'K') => Ok(Command::GetClearCount),
        (b'G', b'X') => Ok(Command::GetExpectedIoCount),
        (b'G', b'O') => Ok(Command::GetMode { channel: args.id(3)? }),
        (b'S', kind @ (b'C' | b'T')) => {
            let payload = args.exact(SET_ALARM_LEN)?;
            let rules = if kind == b'C' { ScheduleMode::OnOff } else { ScheduleMode::Cycle };
            Ok(Command::ConfigureAlarm(SlotConfig {
                channel: args.id(3)?,
                slot: args.slot(4)?,
                rules,
                enabled: args.flag(5)?,
                time: TimeOfDay::parse(&payload[7..15]).ok_or(CommandError::MalformedTime)?,
            }))
        }
        (b'S', b'M') => Ok(Command::SetMasterEnable(args.flag(3)?)),
        (b'S', b'A') => Ok(Command::ClearStore),
        (b'S', b'X') => match args.byte(3)? {
            b'C' => Ok(Command::ResyncOutput { channel: args.id(4)? }),
            _ => Err(CommandError::UnknownOperation),
        },
        (b'S', b'O') => {
            let channel = args.id(3)?;
            let mode = ScheduleMode::from_ascii(args.byte(4)?).ok_or(CommandError::BadArgument)?;
            Ok(Command::SwapMode { channel, mode })
        }
        _ => Err(CommandError::UnknownOperation),
    }
}

/// Positional argument reader.
#[derive(Clone, Copy)]
struct Args<'a>(&'a [u8]);

impl<'a> Args<'a> {
    fn byte(self, at: usize) -> Result<u8, CommandError> {
        self.0.get(at).copied().ok_or(CommandError::BadLength)
    }

    fn exact(self, len: usize) -> Result<&'a [u8], CommandError> {
        if self.0.len() == len { Ok(self.0) } else { Err(CommandError::BadLength) }
    }

    fn id<const N: usize>(self, at: usize) -> Result<IoIndex<N>, CommandError> {
        IoIndex::from_ascii(self.byte(at)?).ok_or(CommandError::ChannelOutOfRange)
    }

    fn flag(self, at: usize) -> Result<bool, CommandError> {
        match self.byte(at)? {
            b'0' => Ok(false),
            b'1' => Ok(true),
            _ => Err(CommandError::BadArgument),
        }
    }

    fn slot(self, at: usize) -> Result<SlotKind, CommandError> {
        SlotKind::from_ascii(self.byte(at)?).ok_or(CommandError::BadArgument)
    }
}

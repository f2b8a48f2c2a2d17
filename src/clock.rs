//! Wall-clock time: calendar type, RTC synchronisation and status flags.
//!
//! System time is kept as an epoch anchor plus the monotonic uptime at which
//! the anchor was taken, so reading it never touches the RTC.  The RTC is
//! consulted at start-up, after a client sets the time, and on the periodic
//! drift resync.
//!
//! Three status flags are exposed to clients instead of errors:
//!
//! | Flag            | Set when                                    |
//! |-----------------|---------------------------------------------|
//! | `rtc_configured`| the last RTC read or write succeeded        |
//! | `parse_failure` | the last set-time string did not parse      |
//! | `time_set`      | system time was synchronised from the RTC   |

use core::fmt;

use log::{info, warn};

use crate::alarm::types::{SECS_PER_DAY, two_digits};
use crate::app::ports::RealTimeClock;
use crate::error::CommandError;

const MONTHS: [&[u8; 3]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun", b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
];

/// Years a client may set.
pub const SETTABLE_YEARS: core::ops::RangeInclusive<u16> = 2000..=2099;

// ═══════════════════════════════════════════════════════════════
//  DateTime
// ═══════════════════════════════════════════════════════════════

/// Calendar date and time of day (local time, no zone).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

impl DateTime {
    /// Build a date-time, rejecting impossible calendar fields.
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        let valid = year >= 1970
            && (1..=12).contains(&month)
            && day >= 1
            && day <= days_in_month(year, month)
            && hour <= 23
            && minute <= 59
            && second <= 59;
        valid.then_some(Self { year, month, day, hour, minute, second })
    }

    /// Seconds since 1970-01-01 00:00:00.
    pub fn to_epoch(&self) -> u64 {
        let days = days_from_civil(i64::from(self.year), u32::from(self.month), u32::from(self.day));
        days as u64 * u64::from(SECS_PER_DAY) + u64::from(self.second_of_day())
    }

    pub fn from_epoch(epoch: u64) -> Self {
        let day_secs = u64::from(SECS_PER_DAY);
        let (year, month, day) = civil_from_days((epoch / day_secs) as i64);
        let sod = (epoch % day_secs) as u32;
        Self {
            year: year as u16,
            month: month as u8,
            day: day as u8,
            hour: (sod / 3600) as u8,
            minute: ((sod / 60) % 60) as u8,
            second: (sod % 60) as u8,
        }
    }

    pub fn second_of_day(&self) -> u32 {
        u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second)
    }

    /// Parse the set-time fields: `date` is `Mmm dd yyyy` (day may be
    /// space padded), `time` is `hh:mm:ss`.
    pub fn parse(date: &[u8], time: &[u8]) -> Option<Self> {
        let [m0, m1, m2, b' ', d0, d1, b' ', y @ ..] = date else { return None };
        let month = MONTHS.iter().position(|name| **name == [*m0, *m1, *m2])? as u8 + 1;
        let day = match (d0, d1) {
            (b' ', d @ b'0'..=b'9') => d - b'0',
            _ => two_digits(&[*d0, *d1])?,
        };
        let [y0, y1, y2, y3] = y else { return None };
        let year = u16::from(two_digits(&[*y0, *y1])?) * 100 + u16::from(two_digits(&[*y2, *y3])?);

        let [h0, h1, _, n0, n1, _, s0, s1] = time else { return None };
        let hour = two_digits(&[*h0, *h1])?;
        let minute = two_digits(&[*n0, *n1])?;
        let second = two_digits(&[*s0, *s1])?;

        if !SETTABLE_YEARS.contains(&year) {
            return None;
        }
        Self::new(year, month, day, hour, minute, second)
    }

    /// Reply encoding: year (big-endian), month, day, hour, minute, second.
    pub fn to_wire(&self) -> [u8; 7] {
        let [hi, lo] = self.year.to_be_bytes();
        [hi, lo, self.month, self.day, self.hour, self.minute, self.second]
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}

fn is_leap(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

// Gregorian day-number conversions (era-based, valid for all years >= 0).

fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400;
    let mp = i64::from((month + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(day) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

// ═══════════════════════════════════════════════════════════════
//  Clock
// ═══════════════════════════════════════════════════════════════

/// System time plus RTC status flags.
#[derive(Debug, Default)]
pub struct Clock {
    anchor_epoch: u64,
    anchor_uptime_ms: u64,
    rtc_configured: bool,
    parse_failure: bool,
    time_set: bool,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current system time in epoch seconds.
    pub fn now(&self, uptime_ms: u64) -> u64 {
        self.anchor_epoch + uptime_ms.saturating_sub(self.anchor_uptime_ms) / 1000
    }

    pub fn system_time(&self, uptime_ms: u64) -> DateTime {
        DateTime::from_epoch(self.now(uptime_ms))
    }

    pub fn rtc_configured(&self) -> bool {
        self.rtc_configured
    }

    pub fn parse_failure(&self) -> bool {
        self.parse_failure
    }

    pub fn time_set(&self) -> bool {
        self.time_set
    }

    /// Read the RTC, updating `rtc_configured`.
    pub fn read_rtc(&mut self, rtc: &mut dyn RealTimeClock) -> Option<DateTime> {
        match rtc.read() {
            Ok(time) => {
                self.rtc_configured = true;
                Some(time)
            }
            Err(e) => {
                warn!("clock: RTC read failed: {e}");
                self.rtc_configured = false;
                None
            }
        }
    }

    /// Re-anchor system time on the RTC.  Returns `true` on success, after
    /// which `time_set` is true.
    pub fn sync_from_rtc(&mut self, rtc: &mut dyn RealTimeClock, uptime_ms: u64) -> bool {
        let Some(time) = self.read_rtc(rtc) else { return false };
        self.anchor_epoch = time.to_epoch();
        self.anchor_uptime_ms = uptime_ms;
        if !self.time_set {
            info!("clock: system time set to {time}");
        }
        self.time_set = true;
        true
    }

    /// Handle a client set-time request: parse, write the RTC, resync.
    pub fn set_time(
        &mut self,
        rtc: &mut dyn RealTimeClock,
        date: &[u8],
        time: &[u8],
        uptime_ms: u64,
    ) -> Result<DateTime, CommandError> {
        let Some(parsed) = DateTime::parse(date, time) else {
            self.parse_failure = true;
            warn!("clock: unparseable set-time request");
            return Err(CommandError::MalformedTime);
        };
        self.parse_failure = false;
        if let Err(e) = rtc.write(&parsed) {
            warn!("clock: RTC write failed: {e}");
            return Err(CommandError::HardwareUnavailable);
        }
        self.rtc_configured = true;
        info!("clock: RTC set to {parsed}");
        if !self.sync_from_rtc(rtc, uptime_ms) {
            warn!("clock: RTC accepted {parsed} but read-back failed; system time not set");
        }
        Ok(parsed)
    }
}

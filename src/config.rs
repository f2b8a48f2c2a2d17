//! Controller configuration parameters.
//!
//! Checksum toggles, handler periods and the datagram port.  Loaded through
//! [`ConfigPort`](crate::app::ports::ConfigPort); a missing config yields
//! the defaults below.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Protocol ---
    /// Inbound frames carry a trailing CRC-8.
    pub rx_crc_enabled: bool,
    /// Get replies carry a trailing CRC-8.
    pub tx_crc_enabled: bool,

    // --- Handler periods (milliseconds) ---
    pub serial_poll_ms: u32,
    pub udp_poll_ms: u32,
    pub input_poll_ms: u32,
    pub analog_poll_ms: u32,
    /// Probe conversion start → read-back.
    pub temperature_conversion_ms: u32,
    /// Opto pulse raise → lower.
    pub opto_pulse_ms: u32,
    pub connection_check_ms: u32,
    /// Manual override / master-enable service.
    pub alarm_service_ms: u32,
    /// System time resync from the RTC.
    pub time_resync_ms: u32,

    // --- Network ---
    pub udp_port: u16,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            rx_crc_enabled: true,
            tx_crc_enabled: true,

            serial_poll_ms: 50,
            udp_poll_ms: 50,
            input_poll_ms: 50,
            analog_poll_ms: 250,
            temperature_conversion_ms: 3000,
            opto_pulse_ms: 500,
            connection_check_ms: 15_000,
            alarm_service_ms: 1000,
            time_resync_ms: 86_400_000, // daily

            udp_port: 2390,
        }
    }
}

impl ControllerConfig {
    /// Reject settings the run loop cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let periods = [
            (self.serial_poll_ms, "serial_poll_ms must be > 0"),
            (self.udp_poll_ms, "udp_poll_ms must be > 0"),
            (self.input_poll_ms, "input_poll_ms must be > 0"),
            (self.analog_poll_ms, "analog_poll_ms must be > 0"),
            (self.temperature_conversion_ms, "temperature_conversion_ms must be > 0"),
            (self.opto_pulse_ms, "opto_pulse_ms must be > 0"),
            (self.connection_check_ms, "connection_check_ms must be > 0"),
            (self.alarm_service_ms, "alarm_service_ms must be > 0"),
            (self.time_resync_ms, "time_resync_ms must be > 0"),
        ];
        if let Some((_, msg)) = periods.iter().find(|(ms, _)| *ms == 0) {
            return Err(ConfigError::ValidationFailed(*msg));
        }
        if self.udp_port == 0 {
            return Err(ConfigError::ValidationFailed("udp_port must be non-zero"));
        }
        Ok(())
    }
}

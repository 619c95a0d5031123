//! Reader configuration types
//!
//! One serde-tagged enum covers the three supported transports. The tag
//! (`reader_type = "serial" | "tcpip" | "wiegand"`) matches the wire names
//! used by the operator-facing configuration files.

use crate::types::{ReaderError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a single RFID reader
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reader_type", rename_all = "lowercase")]
pub enum ReaderConfig {
    /// RS232/RS485 serial reader
    Serial(SerialConfig),
    /// TCP/IP network reader
    #[serde(rename = "tcpip")]
    TcpIp(TcpIpConfig),
    /// Wiegand 26/34 pulse-pair reader
    Wiegand(WiegandConfig),
}

impl ReaderConfig {
    /// Reader identifier, independent of transport
    pub fn reader_id(&self) -> &str {
        match self {
            ReaderConfig::Serial(c) => &c.reader_id,
            ReaderConfig::TcpIp(c) => &c.reader_id,
            ReaderConfig::Wiegand(c) => &c.reader_id,
        }
    }

    /// Anti-bounce window, independent of transport
    pub fn anti_bounce(&self) -> Duration {
        let secs = match self {
            ReaderConfig::Serial(c) => c.anti_bounce_secs,
            ReaderConfig::TcpIp(c) => c.anti_bounce_secs,
            ReaderConfig::Wiegand(c) => c.anti_bounce_secs,
        };
        Duration::from_secs_f64(secs)
    }
}

/// Serial (RS232/RS485) reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    pub reader_id: String,
    /// Serial device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub port: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "default_data_bits")]
    pub data_bits: u8,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default = "default_stop_bits")]
    pub stop_bits: u8,
    #[serde(default = "default_anti_bounce_secs")]
    pub anti_bounce_secs: f64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl SerialConfig {
    pub fn new(reader_id: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            reader_id: reader_id.into(),
            port: port.into(),
            baud_rate: default_baud_rate(),
            data_bits: default_data_bits(),
            parity: Parity::default(),
            stop_bits: default_stop_bits(),
            anti_bounce_secs: default_anti_bounce_secs(),
            read_timeout_ms: default_read_timeout_ms(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }

    /// Builder method: set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Builder method: set the parity
    pub fn with_parity(mut self, parity: Parity) -> Self {
        self.parity = parity;
        self
    }
}

/// Serial parity setting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    #[default]
    #[serde(rename = "N")]
    None,
    #[serde(rename = "E")]
    Even,
    #[serde(rename = "O")]
    Odd,
}

/// TCP/IP reader configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TcpIpConfig {
    pub reader_id: String,
    /// Reader hostname or IP address
    pub host: String,
    #[serde(default = "default_tcp_port")]
    pub port: u16,
    #[serde(default = "default_anti_bounce_secs")]
    pub anti_bounce_secs: f64,
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,
}

impl TcpIpConfig {
    pub fn new(reader_id: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            reader_id: reader_id.into(),
            host: host.into(),
            port: default_tcp_port(),
            anti_bounce_secs: default_anti_bounce_secs(),
            read_timeout_ms: default_read_timeout_ms(),
            reconnect_delay_secs: default_reconnect_delay_secs(),
        }
    }

    /// Builder method: set the TCP port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

/// Wiegand reader configuration
///
/// `format_length` must be 26 or 34; anything else is rejected when the
/// reader is constructed, not when frames arrive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WiegandConfig {
    pub reader_id: String,
    /// GPIO pin carrying D0 (bit 0) pulses
    pub d0_pin: u8,
    /// GPIO pin carrying D1 (bit 1) pulses
    pub d1_pin: u8,
    #[serde(default = "default_format_length")]
    pub format_length: u8,
    #[serde(default = "default_bit_timeout_ms")]
    pub bit_timeout_ms: u64,
    #[serde(default = "default_anti_bounce_secs")]
    pub anti_bounce_secs: f64,
}

impl WiegandConfig {
    pub fn new(reader_id: impl Into<String>, d0_pin: u8, d1_pin: u8) -> Self {
        Self {
            reader_id: reader_id.into(),
            d0_pin,
            d1_pin,
            format_length: default_format_length(),
            bit_timeout_ms: default_bit_timeout_ms(),
            anti_bounce_secs: default_anti_bounce_secs(),
        }
    }

    /// Builder method: set the frame format length (26 or 34)
    pub fn with_format_length(mut self, format_length: u8) -> Self {
        self.format_length = format_length;
        self
    }

    /// Inter-bit timeout as a duration
    pub fn bit_timeout(&self) -> Duration {
        Duration::from_millis(self.bit_timeout_ms)
    }

    /// Validate the configured format length
    pub fn validate(&self) -> Result<()> {
        match self.format_length {
            26 | 34 => Ok(()),
            other => Err(ReaderError::Configuration(format!(
                "Unsupported Wiegand format length: {} (expected 26 or 34)",
                other
            ))),
        }
    }
}

fn default_baud_rate() -> u32 {
    115200
}

fn default_data_bits() -> u8 {
    8
}

fn default_stop_bits() -> u8 {
    1
}

fn default_tcp_port() -> u16 {
    6000
}

fn default_anti_bounce_secs() -> f64 {
    2.0
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_reconnect_delay_secs() -> u64 {
    5
}

fn default_format_length() -> u8 {
    26
}

fn default_bit_timeout_ms() -> u64 {
    50
}

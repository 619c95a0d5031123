//! RS232/RS485 serial transport
//!
//! Connects to TY-series readers over a serial device using the
//! `serialport` crate. The port timeout doubles as the bounded-wait read
//! interval of the shared line loop.

use crate::config::{Parity, SerialConfig};
use crate::readers::line::{LineReader, LineReaderOptions, LineTransport};
use crate::types::{ReaderError, Result};
use std::io::Read;
use std::time::Duration;

/// Serial RFID reader
pub type SerialReader = LineReader<SerialTransport>;

impl SerialReader {
    /// Build a serial reader from its configuration
    ///
    /// Validates line settings up front; an unknown data-bit or stop-bit
    /// count is a configuration error here, not a connect failure later.
    pub fn from_config(config: SerialConfig) -> Result<Self> {
        let options = LineReaderOptions {
            reader_id: config.reader_id.clone(),
            anti_bounce: Duration::from_secs_f64(config.anti_bounce_secs),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
        };
        Ok(LineReader::new(SerialTransport::new(config)?, options))
    }
}

/// Connection parameters for a serial port
pub struct SerialTransport {
    config: SerialConfig,
    data_bits: serialport::DataBits,
    parity: serialport::Parity,
    stop_bits: serialport::StopBits,
}

impl SerialTransport {
    pub fn new(config: SerialConfig) -> Result<Self> {
        let data_bits = match config.data_bits {
            5 => serialport::DataBits::Five,
            6 => serialport::DataBits::Six,
            7 => serialport::DataBits::Seven,
            8 => serialport::DataBits::Eight,
            other => {
                return Err(ReaderError::Configuration(format!(
                    "Unsupported data bits: {}",
                    other
                )))
            }
        };
        let stop_bits = match config.stop_bits {
            1 => serialport::StopBits::One,
            2 => serialport::StopBits::Two,
            other => {
                return Err(ReaderError::Configuration(format!(
                    "Unsupported stop bits: {}",
                    other
                )))
            }
        };
        let parity = match config.parity {
            Parity::None => serialport::Parity::None,
            Parity::Even => serialport::Parity::Even,
            Parity::Odd => serialport::Parity::Odd,
        };

        Ok(Self {
            config,
            data_bits,
            parity,
            stop_bits,
        })
    }
}

impl LineTransport for SerialTransport {
    fn describe(&self) -> String {
        format!("{} @ {} baud", self.config.port, self.config.baud_rate)
    }

    fn connect(&self) -> Result<Box<dyn Read + Send>> {
        let port = serialport::new(&self.config.port, self.config.baud_rate)
            .data_bits(self.data_bits)
            .parity(self.parity)
            .stop_bits(self.stop_bits)
            .timeout(Duration::from_millis(self.config.read_timeout_ms))
            .open()
            .map_err(|e| ReaderError::Transport(format!("{}: {}", self.config.port, e)))?;
        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_line_settings_rejected_at_construction() {
        let mut config = SerialConfig::new("r1", "/dev/ttyUSB0");
        config.data_bits = 9;
        assert!(matches!(
            SerialTransport::new(config),
            Err(ReaderError::Configuration(_))
        ));

        let mut config = SerialConfig::new("r1", "/dev/ttyUSB0");
        config.stop_bits = 3;
        assert!(matches!(
            SerialTransport::new(config),
            Err(ReaderError::Configuration(_))
        ));
    }

    #[test]
    fn test_connect_missing_device_is_transport_error() {
        let transport =
            SerialTransport::new(SerialConfig::new("r1", "/dev/nonexistent-tty")).unwrap();
        assert!(matches!(
            transport.connect(),
            Err(ReaderError::Transport(_))
        ));
    }
}

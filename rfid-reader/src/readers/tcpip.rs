//! TCP/IP network transport
//!
//! Maintains a TCP connection to a reader reachable over RJ45. The socket
//! read timeout provides the bounded wait the shared line loop relies on to
//! observe cancellation.

use crate::config::TcpIpConfig;
use crate::readers::line::{LineReader, LineReaderOptions, LineTransport};
use crate::types::{ReaderError, Result};
use std::io::Read;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// How long a single connection attempt may take
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP/IP RFID reader
pub type TcpIpReader = LineReader<TcpTransport>;

impl TcpIpReader {
    /// Build a TCP/IP reader from its configuration
    pub fn from_config(config: TcpIpConfig) -> Result<Self> {
        let options = LineReaderOptions {
            reader_id: config.reader_id.clone(),
            anti_bounce: Duration::from_secs_f64(config.anti_bounce_secs),
            reconnect_delay: Duration::from_secs(config.reconnect_delay_secs),
        };
        Ok(LineReader::new(TcpTransport::new(config), options))
    }
}

/// Connection parameters for a TCP reader endpoint
pub struct TcpTransport {
    config: TcpIpConfig,
}

impl TcpTransport {
    pub fn new(config: TcpIpConfig) -> Self {
        Self { config }
    }
}

impl LineTransport for TcpTransport {
    fn describe(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn connect(&self) -> Result<Box<dyn Read + Send>> {
        let addr = (self.config.host.as_str(), self.config.port)
            .to_socket_addrs()
            .map_err(|e| ReaderError::Transport(format!("{}: {}", self.describe(), e)))?
            .next()
            .ok_or_else(|| {
                ReaderError::Transport(format!("{}: no address resolved", self.describe()))
            })?;

        let stream = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| ReaderError::Transport(format!("{}: {}", self.describe(), e)))?;
        stream.set_read_timeout(Some(Duration::from_millis(self.config.read_timeout_ms)))?;

        Ok(Box::new(stream))
    }
}

//! RFID reader implementations (serial, TCP/IP, Wiegand)
//!
//! Every reader runs its own thread and reports detections through a
//! [`TagHandler`]. Serial and TCP share the line-oriented read loop in
//! [`line`]; the Wiegand reader consumes pulse events instead of a byte
//! stream. Transport failures never escape a running reader - the loop logs
//! them and reconnects after a fixed delay for as long as the reader is
//! running.

use crate::types::{ConnectionState, Result, TagHandler};

pub mod line;
pub mod serial;
pub mod tcpip;
pub mod wiegand;

// Re-export reader types
pub use line::{LineReader, LineReaderOptions, LineTransport};
pub use serial::{SerialReader, SerialTransport};
pub use tcpip::{TcpIpReader, TcpTransport};
pub use wiegand::WiegandReader;

/// Common capability set of all RFID readers
///
/// `start_reading` spawns the reader's thread; `stop_reading` stops it and
/// guarantees that after it returns no further handler invocation occurs and
/// the transport resources are released. Stopping is valid from any state.
pub trait RfidReader: Send + Sync {
    /// Identifier of this reader (unique within a registry)
    fn reader_id(&self) -> &str;

    /// Current connection state
    fn state(&self) -> ConnectionState;

    /// Start the read loop, delivering accepted detections to `handler`
    ///
    /// Fails with [`crate::ReaderError::AlreadyRunning`] if the reader is
    /// already started. Connection failures do not fail this call - the
    /// loop retries them indefinitely.
    fn start_reading(&self, handler: TagHandler) -> Result<()>;

    /// Stop the read loop and release transport resources
    ///
    /// Must not be called from the reader's own handler thread.
    fn stop_reading(&self);

    /// Number of malformed frames discarded since construction
    fn discarded_frames(&self) -> u64;
}

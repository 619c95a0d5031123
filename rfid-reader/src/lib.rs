//! RFID Reader Library
//!
//! A reusable library for reading RFID tag detections from race timing
//! hardware over serial (RS232/RS485), TCP/IP and Wiegand 26/34 transports.
//!
//! # Architecture
//!
//! This library is intentionally minimal and focused on acquisition:
//! - Reconstructs tag identifiers from three structurally different wire
//!   formats (line-oriented ASCII frames, Wiegand pulse pairs)
//! - Validates frames (hex tag identifiers, Wiegand parity) and discards
//!   noise without raising
//! - Applies per-reader anti-bounce filtering
//! - Reconnects failed transports indefinitely at a fixed delay
//!
//! The library does NOT:
//! - Know about riders, laps, events or results
//! - Persist anything
//! - Decide what a detection means for a race
//!
//! All higher-level functionality is in the application layer (race-timing).
//!
//! # Example Usage
//!
//! ```no_run
//! use rfid_reader::{ReaderConfig, ReaderRegistry, TcpIpConfig};
//! use std::sync::Arc;
//!
//! let configs = vec![
//!     ReaderConfig::TcpIp(TcpIpConfig::new("finish_line", "192.168.1.100")),
//! ];
//!
//! let registry = ReaderRegistry::from_configs(&configs).unwrap();
//! registry
//!     .start_all(Arc::new(|detection| {
//!         println!("Tag {} on {}", detection.tag_id, detection.reader_id);
//!     }))
//!     .unwrap();
//!
//! // ... race runs ...
//!
//! registry.stop_all();
//! ```

// Public modules
pub mod config;
pub mod debounce;
pub mod protocol;
pub mod readers;
pub mod registry;
pub mod types;
pub mod wiegand;

// Re-export main types for convenience
pub use config::{Parity, ReaderConfig, SerialConfig, TcpIpConfig, WiegandConfig};
pub use debounce::AntiBounce;
pub use readers::{RfidReader, SerialReader, TcpIpReader, WiegandReader};
pub use registry::{build_reader, ReaderRegistry};
pub use types::{
    ConnectionState, ReaderError, Result, TagDetection, TagHandler, Timestamp,
};
pub use wiegand::{Pulse, PulseLine, WiegandFormat};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Core types for the RFID reader library
//!
//! This module defines the types the readers emit while running. A reader is
//! stateful only about its own connection - it outputs tag detections and
//! does not know anything about riders, laps or events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Timestamp type used throughout the reader library
pub type Timestamp = DateTime<Utc>;

/// Result type for reader operations
pub type Result<T> = std::result::Result<T, ReaderError>;

/// A single tag detection emitted by a reader
///
/// This is the unified output of all transports: serial and TCP frames carry
/// the tag identifier verbatim, Wiegand card numbers are rendered as
/// 8-character uppercase hex so every transport shares one identifier space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagDetection {
    /// Tag identifier (EPC), hex string
    pub tag_id: String,
    /// Identifier of the reader that produced this detection
    pub reader_id: String,
    /// Antenna port number (if the reader reports one)
    pub antenna_port: Option<u8>,
    /// Signal strength in dBm (if the reader reports one)
    pub signal_strength: Option<f32>,
    /// Wall-clock instant the detection was decoded
    pub timestamp: Timestamp,
}

impl TagDetection {
    /// Create a detection stamped with the current time
    pub fn new(tag_id: impl Into<String>, reader_id: impl Into<String>) -> Self {
        Self {
            tag_id: tag_id.into(),
            reader_id: reader_id.into(),
            antenna_port: None,
            signal_strength: None,
            timestamp: Utc::now(),
        }
    }
}

/// Connection state of a reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Not connected; a running reader will retry
    Disconnected,
    /// Connection attempt in progress
    Connecting,
    /// Connected and consuming input
    Reading,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Reading => write!(f, "reading"),
        }
    }
}

/// Errors that can occur in the reader library
///
/// Transport errors never escape a running reader - the read loop logs them
/// and reconnects. They surface only from direct connection attempts.
/// Configuration errors are fatal and raised at construction time.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid reader configuration: {0}")]
    Configuration(String),

    #[error("Reader is already running")]
    AlreadyRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Callback invoked for every accepted tag detection
///
/// Handlers run on the reader's own thread and must not block for long;
/// a slow handler delays that reader (and only that reader).
pub type TagHandler = Arc<dyn Fn(TagDetection) + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_defaults() {
        let det = TagDetection::new("AABBCCDD", "finish_line");
        assert_eq!(det.tag_id, "AABBCCDD");
        assert_eq!(det.reader_id, "finish_line");
        assert!(det.antenna_port.is_none());
        assert!(det.signal_strength.is_none());
    }

    #[test]
    fn test_connection_state_display() {
        assert_eq!(format!("{}", ConnectionState::Disconnected), "disconnected");
        assert_eq!(format!("{}", ConnectionState::Reading), "reading");
    }
}

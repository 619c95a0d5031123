//! Line-oriented wire protocol shared by the serial and TCP transports
//!
//! The TY-series readers send ASCII frames terminated by CRLF:
//!
//! ```text
//! <tagId>[,<rssi>[,<antenna>]]\r\n
//! ```
//!
//! Frames that do not yield a valid tag identifier are discarded without
//! raising - the only observable effect is the reader's discard counter.

/// Frame terminator sent by the readers
pub const FRAME_TERMINATOR: u8 = b'\n';

/// Upper bound on buffered bytes while waiting for a terminator.
///
/// A reader that never sends a terminator (wrong baud rate, binary noise)
/// must not grow the buffer without limit; past this size the buffer is
/// dropped and counted as one discarded frame.
pub const MAX_FRAME_LEN: usize = 4096;

/// A parsed line frame, before anti-bounce filtering
#[derive(Debug, Clone, PartialEq)]
pub struct TagFrame {
    /// Validated tag identifier (hex string)
    pub tag_id: String,
    /// Signal strength in dBm, if present and parsable
    pub signal_strength: Option<f32>,
    /// Antenna port, if present and parsable
    pub antenna_port: Option<u8>,
}

/// Accumulates raw bytes and splits them into terminated frames
///
/// Both the serial and the TCP read loops feed whatever chunk the transport
/// returned; frame boundaries never align with read boundaries.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: Vec<u8>,
    overflows: u64,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of raw bytes from the transport
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
        if self.buffer.len() > MAX_FRAME_LEN {
            log::warn!(
                "Dropping {} unterminated bytes (no frame terminator seen)",
                self.buffer.len()
            );
            self.buffer.clear();
            self.overflows += 1;
        }
    }

    /// Pop the next complete frame, if one is buffered
    ///
    /// The returned frame excludes the terminator; a trailing `\r` from a
    /// CRLF pair is stripped as well.
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        let pos = self.buffer.iter().position(|&b| b == FRAME_TERMINATOR)?;
        let mut frame: Vec<u8> = self.buffer.drain(..=pos).collect();
        frame.pop(); // terminator
        if frame.last() == Some(&b'\r') {
            frame.pop();
        }
        Some(frame)
    }

    /// Number of times the buffer overflowed without a terminator
    pub fn overflows(&self) -> u64 {
        self.overflows
    }
}

/// Parse a terminated frame into a tag reading
///
/// Returns `None` for frames that are not ASCII, carry no valid tag
/// identifier, or are empty. Optional fields that fail to parse are carried
/// as `None` rather than failing the whole frame.
pub fn parse_frame(frame: &[u8]) -> Option<TagFrame> {
    let message = std::str::from_utf8(frame).ok()?.trim();
    let mut parts = message.split(',');

    let tag_id = parts.next()?.trim();
    if !valid_tag_id(tag_id) {
        return None;
    }

    let signal_strength = parts.next().and_then(|s| s.trim().parse::<f32>().ok());
    let antenna_port = parts.next().and_then(|s| s.trim().parse::<u8>().ok());

    Some(TagFrame {
        tag_id: tag_id.to_string(),
        signal_strength,
        antenna_port,
    })
}

/// Validate a tag identifier: non-empty, at least 4 characters, hex digits
///
/// EPCs can be up to 96 bits, so validation checks the digits rather than
/// parsing into a fixed-width integer.
pub fn valid_tag_id(tag_id: &str) -> bool {
    tag_id.len() >= 4 && tag_id.bytes().all(|b| b.is_ascii_hexdigit())
}

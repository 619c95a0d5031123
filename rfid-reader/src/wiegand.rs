//! Wiegand 26/34 frame assembly and decoding
//!
//! Wiegand readers deliver bits as pulses on two lines (D0 = bit 0,
//! D1 = bit 1) with no framing delimiter; a frame ends when the line stays
//! quiet for longer than the inter-bit timeout. The assembler collects
//! timestamped pulses into a bit buffer and closes the frame on that gap.
//!
//! ## Frame layout
//!
//! ```text
//! W26: [even parity][ 8-bit facility ][ 16-bit card ][odd parity]
//! W34: [even parity][       32-bit card number      ][odd parity]
//! ```
//!
//! The leading parity bit covers the first half of the data bits (even
//! parity), the trailing bit covers the second half (odd parity). Frames
//! with the wrong length or a failed parity check are discarded; the decoded
//! card value is rendered as 8-character uppercase hex so Wiegand tags share
//! the serial/TCP identifier space.

use crate::types::{ReaderError, Result};
use std::time::{Duration, Instant};

/// Supported Wiegand frame formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WiegandFormat {
    /// 26-bit frames: 8-bit facility code + 16-bit card number
    W26,
    /// 34-bit frames: 32-bit card number
    W34,
}

impl WiegandFormat {
    /// Frame length in bits, including both parity bits
    pub fn frame_len(&self) -> usize {
        match self {
            WiegandFormat::W26 => 26,
            WiegandFormat::W34 => 34,
        }
    }
}

impl TryFrom<u8> for WiegandFormat {
    type Error = ReaderError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            26 => Ok(WiegandFormat::W26),
            34 => Ok(WiegandFormat::W34),
            other => Err(ReaderError::Configuration(format!(
                "Unsupported Wiegand format length: {} (expected 26 or 34)",
                other
            ))),
        }
    }
}

/// Which data line a pulse arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseLine {
    /// D0 line - encodes a 0 bit
    D0,
    /// D1 line - encodes a 1 bit
    D1,
}

/// A single timestamped pulse from the reader hardware
#[derive(Debug, Clone, Copy)]
pub struct Pulse {
    pub line: PulseLine,
    pub at: Instant,
}

impl Pulse {
    pub fn bit(&self) -> u8 {
        match self.line {
            PulseLine::D0 => 0,
            PulseLine::D1 => 1,
        }
    }
}

/// Collects pulses into frames using the inter-bit gap as the boundary
#[derive(Debug)]
pub struct FrameAssembler {
    format: WiegandFormat,
    bit_timeout: Duration,
    bits: Vec<u8>,
    last_bit_at: Option<Instant>,
    discarded: u64,
}

impl FrameAssembler {
    pub fn new(format: WiegandFormat, bit_timeout: Duration) -> Self {
        Self {
            format,
            bit_timeout,
            bits: Vec::with_capacity(format.frame_len()),
            last_bit_at: None,
            discarded: 0,
        }
    }

    /// Feed one pulse into the assembler
    ///
    /// A pulse arriving after a gap longer than the bit timeout starts a new
    /// frame; whatever was pending is finished first and returned if it
    /// decodes (mirrors what the caller would get from [`poll`]).
    pub fn push(&mut self, pulse: Pulse) -> Option<u32> {
        let completed = match self.last_bit_at {
            Some(last)
                if pulse.at.duration_since(last) > self.bit_timeout && !self.bits.is_empty() =>
            {
                self.take_frame()
            }
            _ => None,
        };
        self.bits.push(pulse.bit());
        self.last_bit_at = Some(pulse.at);
        completed
    }

    /// Close the pending frame if the line has been quiet past the timeout
    ///
    /// Called periodically by the reader loop so the final frame of a burst
    /// does not wait for the next card to flush it out.
    pub fn poll(&mut self, now: Instant) -> Option<u32> {
        match self.last_bit_at {
            Some(last) if now.duration_since(last) > self.bit_timeout && !self.bits.is_empty() => {
                self.take_frame()
            }
            _ => None,
        }
    }

    /// Number of frames discarded for bad length or parity
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    fn take_frame(&mut self) -> Option<u32> {
        let bits = std::mem::take(&mut self.bits);
        if bits.len() != self.format.frame_len() {
            log::warn!(
                "Invalid Wiegand sequence length: {}, expected {}",
                bits.len(),
                self.format.frame_len()
            );
            self.discarded += 1;
            return None;
        }

        let decoded = match self.format {
            WiegandFormat::W26 => decode_w26(&bits),
            WiegandFormat::W34 => decode_w34(&bits),
        };
        if decoded.is_none() {
            self.discarded += 1;
        }
        decoded
    }
}

/// Render a decoded card value as a tag identifier
pub fn card_to_tag_id(card: u32) -> String {
    format!("{:08X}", card)
}

/// Decode a 26-bit frame into `(facility << 16) | card`
///
/// Returns `None` on any parity mismatch.
pub fn decode_w26(bits: &[u8]) -> Option<u32> {
    debug_assert_eq!(bits.len(), 26);

    let even_parity = bits[0];
    let odd_parity = bits[25];
    let data = &bits[1..25];

    // Leading bit: even parity over the first 12 data bits
    if parity(&data[..12]) != even_parity {
        log::warn!("Wiegand-26 even parity check failed");
        return None;
    }
    // Trailing bit: odd parity over the last 12 data bits
    if parity(&data[12..]) != 1 - odd_parity {
        log::warn!("Wiegand-26 odd parity check failed");
        return None;
    }

    let facility = bits_to_u32(&data[..8]);
    let card = bits_to_u32(&data[8..]);
    Some((facility << 16) | card)
}

/// Decode a 34-bit frame into the 32-bit card number
///
/// Returns `None` on any parity mismatch.
pub fn decode_w34(bits: &[u8]) -> Option<u32> {
    debug_assert_eq!(bits.len(), 34);

    let even_parity = bits[0];
    let odd_parity = bits[33];
    let data = &bits[1..33];

    if parity(&data[..16]) != even_parity {
        log::warn!("Wiegand-34 even parity check failed");
        return None;
    }
    if parity(&data[16..]) != 1 - odd_parity {
        log::warn!("Wiegand-34 odd parity check failed");
        return None;
    }

    Some(bits_to_u32(data))
}

fn parity(bits: &[u8]) -> u8 {
    bits.iter().map(|b| b & 1).sum::<u8>() % 2
}

fn bits_to_u32(bits: &[u8]) -> u32 {
    bits.iter().fold(0u32, |acc, &b| (acc << 1) | b as u32)
}

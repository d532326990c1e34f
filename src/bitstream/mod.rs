use thiserror::Error;

use crate::config::{self, TextEncoding};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("character {ch:?} at position {index} does not fit in 8 bits")]
    UnrepresentableChar { ch: char, index: usize },
    #[error("payload contains the end-of-message marker at bit {bit_offset}")]
    TerminatorCollision { bit_offset: usize },
}

/// Sliding 16-bit view over a bit sequence that reports when the
/// end-of-message marker has just been completed.
#[derive(Debug, Default, Clone)]
pub struct TerminatorWindow {
    window: u16,
    seen: usize,
}

impl TerminatorWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shift in one bit. Returns `true` if the last 16 bits form the marker.
    pub fn push(&mut self, bit: u8) -> bool {
        self.window = (self.window << 1) | u16::from(bit & 1);
        self.seen += 1;
        self.seen >= config::TERMINATOR_BITS && self.window == config::TERMINATOR
    }

    /// Number of bits pushed so far.
    pub fn seen(&self) -> usize {
        self.seen
    }
}

/// A message rendered as payload bits (MSB first) followed by the marker.
/// Each element is `0` or `1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitStream {
    bits: Vec<u8>,
}

impl BitStream {
    pub fn build(message: &str, encoding: TextEncoding) -> Result<Self, EncodingError> {
        let payload = message_to_bytes(message, encoding)?;

        let mut bits = Vec::with_capacity(config::required_units(payload.len()));
        for byte in &payload {
            push_byte_bits(&mut bits, *byte);
        }
        for shift in (0..config::TERMINATOR_BITS).rev() {
            bits.push(((config::TERMINATOR >> shift) & 1) as u8);
        }

        // The decoder stops at the first marker, so an earlier one would
        // silently truncate the message.
        let end = first_terminator_end(&bits);
        if end != Some(bits.len()) {
            let bit_offset = end.map_or(0, |e| e - config::TERMINATOR_BITS);
            return Err(EncodingError::TerminatorCollision { bit_offset });
        }

        Ok(Self { bits })
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Bits before the end-of-message marker.
    pub fn payload_bits(&self) -> &[u8] {
        &self.bits[..self.bits.len() - config::TERMINATOR_BITS]
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    /// Never true: even an empty message carries the marker.
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }
}

/// Convert a message to payload bytes according to `encoding`.
pub fn message_to_bytes(message: &str, encoding: TextEncoding) -> Result<Vec<u8>, EncodingError> {
    match encoding {
        TextEncoding::Utf8 => Ok(message.as_bytes().to_vec()),
        TextEncoding::Latin1 => message
            .chars()
            .enumerate()
            .map(|(index, ch)| {
                u8::try_from(u32::from(ch))
                    .map_err(|_| EncodingError::UnrepresentableChar { ch, index })
            })
            .collect(),
    }
}

/// Inverse of [`message_to_bytes`]. Invalid UTF-8 is replaced rather than
/// rejected, since a coincidental marker always yields some string.
pub fn bytes_to_message(bytes: &[u8], encoding: TextEncoding) -> String {
    match encoding {
        TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Rebuild a message from payload bits (marker already stripped).
/// A trailing group shorter than 8 bits is dropped.
pub fn parse(bits: &[u8], encoding: TextEncoding) -> String {
    let bytes: Vec<u8> = bits
        .chunks_exact(config::BITS_PER_BYTE)
        .map(|group| group.iter().fold(0u8, |acc, &bit| (acc << 1) | (bit & 1)))
        .collect();
    bytes_to_message(&bytes, encoding)
}

fn push_byte_bits(bits: &mut Vec<u8>, byte: u8) {
    for shift in (0..config::BITS_PER_BYTE).rev() {
        bits.push((byte >> shift) & 1);
    }
}

/// Exclusive end index of the earliest marker occurrence.
fn first_terminator_end(bits: &[u8]) -> Option<usize> {
    let mut window = TerminatorWindow::new();
    bits.iter()
        .position(|&bit| window.push(bit))
        .map(|i| i + 1)
}

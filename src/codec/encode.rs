use log::debug;

use crate::bitstream::BitStream;
use crate::codec::StegoError;
use crate::config::TextEncoding;

/// Embed `message` into a copy of `carrier` and return the copy.
pub fn encode(carrier: &[u8], message: &str, encoding: TextEncoding) -> Result<Vec<u8>, StegoError> {
    let mut out = carrier.to_vec();
    encode_in_place(&mut out, message, encoding)?;
    Ok(out)
}

/// Embed `message` directly into `carrier`. Returns the number of carrier
/// bytes whose LSB was written.
///
/// Nothing is written unless the whole bit-stream fits.
pub fn encode_in_place(
    carrier: &mut [u8],
    message: &str,
    encoding: TextEncoding,
) -> Result<usize, StegoError> {
    let embedder = Embedder::new(message, encoding, carrier.len())?;
    Ok(embedder.embed_at(0, carrier))
}

/// A bit-stream that has already been checked against the carrier capacity.
///
/// Carriers that arrive in pieces (video frames) are written with
/// [`Embedder::embed_at`], each piece at its absolute offset. Pieces are
/// independent, so they can be embedded in any order or in parallel.
#[derive(Debug, Clone)]
pub struct Embedder {
    stream: BitStream,
}

impl Embedder {
    /// Build the bit-stream for `message` and verify it fits in `available`
    /// carrier bytes.
    pub fn new(message: &str, encoding: TextEncoding, available: usize) -> Result<Self, StegoError> {
        let stream = BitStream::build(message, encoding)?;
        if stream.len() > available {
            return Err(StegoError::CapacityExceeded {
                required: stream.len(),
                available,
            });
        }
        debug!("embedding {} bits into {} carrier bytes", stream.len(), available);
        Ok(Self { stream })
    }

    /// Total bits (and thus carrier bytes) the payload occupies.
    pub fn total_bits(&self) -> usize {
        self.stream.len()
    }

    /// Write the bits that fall in `[offset, offset + chunk.len())` into
    /// `chunk`. Returns how many bytes of `chunk` were touched.
    pub fn embed_at(&self, offset: usize, chunk: &mut [u8]) -> usize {
        let bits = self.stream.bits();
        if offset >= bits.len() {
            return 0;
        }
        let end = (offset + chunk.len()).min(bits.len());
        let bits = &bits[offset..end];
        for (unit, &bit) in chunk.iter_mut().zip(bits) {
            *unit = (*unit & 0xFE) | bit;
        }
        bits.len()
    }
}

use log::debug;

use crate::bitstream::{self, TerminatorWindow};
use crate::codec::StegoError;
use crate::config::{self, TextEncoding};

/// Recover the message hidden in `carrier`.
///
/// Scanning stops at the first end-of-message marker. A carrier with no
/// marker at all yields [`StegoError::NoHiddenMessage`].
pub fn decode(carrier: &[u8], encoding: TextEncoding) -> Result<String, StegoError> {
    let mut scanner = Scanner::new(encoding);
    scanner.feed(carrier);
    scanner.finish()
}

/// Incremental LSB scanner.
///
/// Feed carrier bytes in scan order with [`Scanner::feed`] until it reports
/// the marker, then call [`Scanner::finish`]. Payload bits are packed into
/// bytes as they arrive so memory stays at one eighth of the bytes scanned.
#[derive(Debug)]
pub struct Scanner {
    encoding: TextEncoding,
    window: TerminatorWindow,
    packed: Vec<u8>,
    current: u8,
    found: bool,
}

impl Scanner {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            window: TerminatorWindow::new(),
            packed: Vec::new(),
            current: 0,
            found: false,
        }
    }

    /// Scan `chunk`. Returns `true` once the marker has been seen; bytes
    /// after the marker (and any later chunks) are ignored.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        if self.found {
            return true;
        }
        for &unit in chunk {
            let bit = unit & 1;
            self.current = (self.current << 1) | bit;
            let found = self.window.push(bit);
            if self.window.seen() % config::BITS_PER_BYTE == 0 {
                self.packed.push(self.current);
                self.current = 0;
            }
            if found {
                self.found = true;
                break;
            }
        }
        self.found
    }

    /// Carrier bytes consumed so far.
    pub fn units_scanned(&self) -> usize {
        self.window.seen()
    }

    pub fn is_found(&self) -> bool {
        self.found
    }

    /// Rebuild the message from everything before the marker.
    pub fn finish(self) -> Result<String, StegoError> {
        if !self.found {
            debug!("scanned {} bytes without finding a marker", self.window.seen());
            return Err(StegoError::NoHiddenMessage);
        }
        let payload_bits = self.window.seen() - config::TERMINATOR_BITS;
        // A trailing partial byte is dropped.
        let payload_bytes = payload_bits / config::BITS_PER_BYTE;
        debug!("marker found after {} payload bits", payload_bits);
        Ok(bitstream::bytes_to_message(
            &self.packed[..payload_bytes],
            self.encoding,
        ))
    }
}

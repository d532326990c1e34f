pub mod decode;
pub mod encode;

use thiserror::Error;

use crate::bitstream::EncodingError;
use crate::config;

pub use decode::{decode, Scanner};
pub use encode::{encode, encode_in_place, Embedder};

/// Failures of the LSB codec itself. File and transcode problems are
/// reported by the media adapters instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StegoError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error("carrier too small: need {required} bytes, have {available}")]
    CapacityExceeded { required: usize, available: usize },
    #[error("no hidden message found")]
    NoHiddenMessage,
}

/// Largest message, in payload bytes, that fits in a carrier of `units` bytes.
pub fn max_message_len(units: usize) -> usize {
    config::max_payload_bytes(units)
}

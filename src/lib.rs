pub mod bitstream;
pub mod codec;
pub mod config;
pub mod media;
pub mod pipeline;

pub use codec::{decode, encode, encode_in_place, StegoError};
pub use config::{StegoConfig, TextEncoding};
pub use media::{AdapterError, MediaKind};
pub use pipeline::hook::{NoopHook, PipelineHook};
pub use pipeline::{capacity, decode_file, encode_file, roundtrip, EncodeReport, RoundtripResult};

pub mod decode;
pub mod encode;
pub mod hook;

use std::path::Path;

use anyhow::{Context, Result};

use crate::codec;
use crate::config::{self, StegoConfig};
use crate::media::{audio, image as image_io, video, MediaKind};
use hook::PipelineHook;

pub use decode::decode_file;
pub use encode::{encode_file, EncodeReport};

/// Result of a full encode → hook → decode roundtrip.
#[derive(Debug, Clone)]
pub struct RoundtripResult {
    pub report: EncodeReport,
    /// Message read back from the (possibly hook-transformed) carrier.
    pub decoded: String,
    /// `true` if the decoded message equals the input message.
    pub matched: bool,
}

/// Largest message, in payload bytes, the medium at `input` can hold.
pub fn capacity(kind: MediaKind, input: &Path, cfg: &StegoConfig) -> Result<usize> {
    let units = match kind {
        MediaKind::Image => {
            let image = image_io::load(input).context("failed to load carrier image")?;
            let (width, height) = image.dimensions();
            config::units_per_frame(width, height)
        }
        MediaKind::Audio => audio::load(input, cfg)
            .context("failed to read carrier audio")?
            .units(),
        MediaKind::Video => video::probe(&cfg.ffprobe, input, true)?.units(),
    };
    Ok(codec::max_message_len(units))
}

/// Run a full encode → hook → decode roundtrip.
///
/// Steps:
/// 1. Embeds `message` into `input`, writing `encoded_path`.
/// 2. Calls `hook.after_encode(encoded_path, &report)`; an upload/download or any
///    other transfer of the carrier happens here.
/// 3. Decodes the path returned by the hook and compares the messages.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use lsbsteg::{roundtrip, MediaKind, NoopHook, StegoConfig};
///
/// let result = roundtrip(
///     MediaKind::Image,
///     Path::new("cover.png"),
///     Path::new("encoded.png"),
///     "meet at noon",
///     &StegoConfig::default(),
///     &NoopHook,
/// ).unwrap();
///
/// assert!(result.matched, "round-trip failed: got {:?}", result.decoded);
/// ```
pub fn roundtrip<H: PipelineHook>(
    kind: MediaKind,
    input: &Path,
    encoded_path: &Path,
    message: &str,
    cfg: &StegoConfig,
    hook: &H,
) -> Result<RoundtripResult> {
    let report = encode::encode_file(kind, input, encoded_path, message, cfg)?;

    let decode_from = hook.after_encode(encoded_path, &report)?;
    let decoded = decode::decode_file(kind, &decode_from, cfg)?;
    let matched = decoded == message;

    Ok(RoundtripResult {
        report,
        decoded,
        matched,
    })
}

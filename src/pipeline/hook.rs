use std::path::{Path, PathBuf};

use anyhow::Result;

use super::encode::EncodeReport;

/// Called between encoding and decoding in a [`roundtrip`](super::roundtrip).
///
/// Implement this trait to move the encoded carrier somewhere and back
/// before it is decoded, for example through a file-sharing service, to
/// check that the hidden bits survive the trip. The report says which
/// medium was written and how many carrier bytes hold the message.
///
/// # Example
///
/// ```rust
/// use std::path::{Path, PathBuf};
/// use anyhow::Result;
/// use lsbsteg::{EncodeReport, MediaKind, PipelineHook};
///
/// struct CopyHook;
///
/// impl PipelineHook for CopyHook {
///     fn after_encode(&self, encoded_path: &Path, report: &EncodeReport) -> Result<PathBuf> {
///         let ext = match report.kind {
///             MediaKind::Image => "copy.png",
///             MediaKind::Audio => "copy.wav",
///             MediaKind::Video => "copy.mkv",
///         };
///         let copy = encoded_path.with_extension(ext);
///         std::fs::copy(encoded_path, &copy)?;
///         Ok(copy)
///     }
/// }
/// ```
pub trait PipelineHook {
    /// Return the path the decoder should read from: the same file, or a
    /// copy that went through a remote round-trip.
    fn after_encode(&self, encoded_path: &Path, report: &EncodeReport) -> Result<PathBuf>;
}

/// Decodes the encoded file where it was written.
pub struct NoopHook;

impl PipelineHook for NoopHook {
    fn after_encode(&self, encoded_path: &Path, _report: &EncodeReport) -> Result<PathBuf> {
        Ok(encoded_path.to_path_buf())
    }
}

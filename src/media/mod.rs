pub mod audio;
pub mod image;
pub mod video;

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::config;

/// Errors raised while reading, converting or writing a medium.
///
/// These are never codec results: a missing file or a failed transcode is
/// reported here, not as "no hidden message".
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("image error")]
    Image(#[from] ::image::ImageError),
    #[error("WAV error")]
    Wav(#[from] hound::Error),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("output format {0} is lossy and would destroy the hidden bits")]
    LossyOutput(String),
    #[error("carrier length mismatch: shape expects {expected} bytes, got {got}")]
    ShapeMismatch { expected: usize, got: usize },
    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),
    #[error("ffprobe failed: {0}")]
    Probe(String),
}

/// Reversible conversion between a medium and its carrier bytes.
///
/// Images, PCM clips and video frame sequences all reduce to the flat byte
/// sequence the codec works on.
///
/// `flatten` must be deterministic and `unflatten(flatten(m))` must rebuild
/// `m` exactly. The shape carries whatever the adapter needs to rebuild the
/// medium; the codec never sees it.
pub trait Adapter {
    type Medium;
    type Shape;

    fn flatten(&self, medium: &Self::Medium) -> (Vec<u8>, Self::Shape);

    fn unflatten(&self, units: Vec<u8>, shape: &Self::Shape) -> Result<Self::Medium, AdapterError>;
}

/// The kind of carrier file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    /// Guess the media kind from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" | "bmp" | "tif" | "tiff" | "jpg" | "jpeg" => Some(Self::Image),
            e if config::WAV_EXTENSIONS.contains(&e) || config::TRANSCODED_AUDIO_EXTENSIONS.contains(&e) => {
                Some(Self::Audio)
            }
            "mkv" | "avi" | "mov" | "mp4" | "webm" | "nut" | "m4v" | "flv" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Audio => "audio",
            Self::Video => "video",
        };
        f.write_str(name)
    }
}

/// Lower-cased file extension, or an empty string.
pub(crate) fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_from_path() {
        assert_eq!(MediaKind::from_path(Path::new("a.PNG")), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_path(Path::new("song.wav")), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_path(Path::new("song.mp3")), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_path(Path::new("take.FLAC")), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_path(Path::new("voice.m4a")), Some(MediaKind::Audio));
        assert_eq!(MediaKind::from_path(Path::new("clip.mp4")), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), None);
        assert_eq!(MediaKind::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_wrapped_error_message_printed_once() {
        let err = AdapterError::from(std::io::Error::new(std::io::ErrorKind::NotFound, "tone.wav is gone"));
        assert_eq!(err.to_string(), "I/O error");

        let chain = format!("{:#}", anyhow::Error::new(err).context("failed to read carrier audio"));
        assert_eq!(chain, "failed to read carrier audio: I/O error: tone.wav is gone");
        assert_eq!(chain.matches("tone.wav is gone").count(), 1);
    }

    #[test]
    fn test_media_kind_display() {
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}

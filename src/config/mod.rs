/// End-of-message marker appended after the payload bits.
pub const TERMINATOR: u16 = 0b1111_1111_1111_1110;
pub const TERMINATOR_BITS: usize = 16;

/// Payload bits carried per message byte.
pub const BITS_PER_BYTE: usize = 8;

/// Channels per pixel in the carrier order (R, G, B).
pub const RGB_CHANNELS: usize = 3;

// Video parameters
pub const DEFAULT_FFMPEG: &str = "ffmpeg";
pub const DEFAULT_FFPROBE: &str = "ffprobe";
pub const DEFAULT_VIDEO_CODEC: &str = "ffv1";
pub const RAW_PIXEL_FORMAT: &str = "rgb24";

/// Containers that can hold an FFV1 stream without touching pixel data.
pub const LOSSLESS_VIDEO_CONTAINERS: [&str; 4] = ["mkv", "avi", "mov", "nut"];

// Audio parameters
/// Extensions read and written directly as WAV.
pub const WAV_EXTENSIONS: [&str; 2] = ["wav", "wave"];
/// Compressed or non-WAV inputs decoded through ffmpeg.
pub const TRANSCODED_AUDIO_EXTENSIONS: [&str; 7] = ["mp3", "flac", "ogg", "oga", "m4a", "aac", "opus"];
/// Raw sample format requested from ffmpeg for non-WAV audio.
pub const RAW_SAMPLE_FORMAT: &str = "s16le";
pub const RAW_SAMPLE_BITS: u16 = 16;

/// How message characters are turned into payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// One byte per character; code points above 255 are rejected.
    #[default]
    Latin1,
    /// UTF-8 byte sequence of the message.
    Utf8,
}

/// Number of carrier units (bytes) needed to hold `payload_bytes` of message.
pub fn required_units(payload_bytes: usize) -> usize {
    payload_bytes * BITS_PER_BYTE + TERMINATOR_BITS
}

/// Largest payload, in bytes, that fits in `units` carrier bytes.
pub fn max_payload_bytes(units: usize) -> usize {
    units.saturating_sub(TERMINATOR_BITS) / BITS_PER_BYTE
}

/// Carrier bytes contributed by one RGB frame.
pub fn units_per_frame(width: u32, height: u32) -> usize {
    width as usize * height as usize * RGB_CHANNELS
}

/// Runtime configuration for an encode/decode operation.
#[derive(Debug, Clone)]
pub struct StegoConfig {
    pub text_encoding: TextEncoding,
    pub ffmpeg: String,
    pub ffprobe: String,
    pub video_codec: String,
    /// Copy the source audio stream into the re-encoded video.
    pub keep_audio: bool,
    pub show_progress: bool,
}

impl Default for StegoConfig {
    fn default() -> Self {
        Self {
            text_encoding: TextEncoding::default(),
            ffmpeg: DEFAULT_FFMPEG.to_string(),
            ffprobe: DEFAULT_FFPROBE.to_string(),
            video_codec: DEFAULT_VIDEO_CODEC.to_string(),
            keep_audio: true,
            show_progress: true,
        }
    }
}

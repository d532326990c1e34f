use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::codec::{self, Scanner, StegoError};
use crate::config::StegoConfig;
use crate::media::audio::{self, PcmAdapter};
use crate::media::image::{self as image_io, ImageAdapter};
use crate::media::video::decoder::VideoDecoder;
use crate::media::{video, Adapter, MediaKind};
use crate::pipeline::encode::frame_progress;

/// Recover a message from an in-memory medium through its adapter.
pub fn extract_medium<A: Adapter>(adapter: &A, medium: &A::Medium, cfg: &StegoConfig) -> Result<String, StegoError> {
    let (units, _) = adapter.flatten(medium);
    codec::decode(&units, cfg.text_encoding)
}

pub fn decode_image(input: &Path, cfg: &StegoConfig) -> Result<String> {
    info!("loading image: {}", input.display());
    let image = image_io::load(input).context("failed to load image")?;
    Ok(extract_medium(&ImageAdapter, &image, cfg)?)
}

pub fn decode_audio(input: &Path, cfg: &StegoConfig) -> Result<String> {
    info!("loading audio: {}", input.display());
    let clip = audio::load(input, cfg).context("failed to read audio")?;
    Ok(extract_medium(&PcmAdapter, &clip, cfg)?)
}

/// Scan video frames in order and stop reading as soon as the marker shows up.
pub fn decode_video(input: &Path, cfg: &StegoConfig) -> Result<String> {
    let shape = video::probe(&cfg.ffprobe, input, false)?;
    let decoder = VideoDecoder::new(cfg, &shape);
    let mut reader = decoder.open(input)?;

    // Frame count is a hint only; without -count_frames it may be 0.
    let progress = frame_progress(shape.frame_count as u64, cfg.show_progress, "green/black")?;
    let mut scanner = Scanner::new(cfg.text_encoding);
    let mut frame = vec![0u8; decoder.frame_size()];

    let mut found = false;
    while reader.read_frame(&mut frame)? {
        progress.inc(1);
        if scanner.feed(&frame) {
            found = true;
            break;
        }
    }
    progress.finish_and_clear();

    if found {
        info!("marker found in frame {}", reader.frames_read());
        reader.abort()?;
    } else {
        reader.finish()?;
    }

    Ok(scanner.finish()?)
}

/// Dispatch on media kind.
///
/// A carrier without a marker surfaces as [`StegoError::NoHiddenMessage`]
/// inside the returned error; adapter failures surface as
/// [`crate::media::AdapterError`] or I/O context and are never mapped onto it.
pub fn decode_file(kind: MediaKind, input: &Path, cfg: &StegoConfig) -> Result<String> {
    let message = match kind {
        MediaKind::Image => decode_image(input, cfg)?,
        MediaKind::Audio => decode_audio(input, cfg)?,
        MediaKind::Video => decode_video(input, cfg)?,
    };
    info!("decoding complete: {} characters", message.chars().count());
    Ok(message)
}

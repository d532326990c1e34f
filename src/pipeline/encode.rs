use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rayon::prelude::*;

use crate::codec::{self, Embedder, StegoError};
use crate::config::StegoConfig;
use crate::media::audio::{self, PcmAdapter};
use crate::media::image::{self as image_io, ImageAdapter};
use crate::media::video::decoder::VideoDecoder;
use crate::media::video::encoder::VideoEncoder;
use crate::media::{video, Adapter, MediaKind};

/// What an encode run wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeReport {
    pub kind: MediaKind,
    /// Carrier bytes whose LSB now holds payload or marker bits.
    pub bits_embedded: usize,
    /// Carrier bytes available in the medium.
    pub carrier_units: usize,
}

/// Embed `message` into an in-memory medium through its adapter.
pub fn embed_medium<A: Adapter>(
    adapter: &A,
    medium: &A::Medium,
    message: &str,
    cfg: &StegoConfig,
) -> Result<(A::Medium, usize)> {
    let (mut units, shape) = adapter.flatten(medium);
    let written = codec::encode_in_place(&mut units, message, cfg.text_encoding)?;
    let medium = adapter.unflatten(units, &shape)?;
    Ok((medium, written))
}

/// Image file -> RGB carrier -> embed -> lossless image file.
pub fn encode_image(input: &Path, output: &Path, message: &str, cfg: &StegoConfig) -> Result<EncodeReport> {
    info!("loading image: {}", input.display());
    let image = image_io::load(input).context("failed to load carrier image")?;
    let (width, height) = image.dimensions();
    let carrier_units = crate::config::units_per_frame(width, height);

    let (encoded, bits_embedded) = embed_medium(&ImageAdapter, &image, message, cfg)?;

    image_io::save(&encoded, output).context("failed to save encoded image")?;
    info!("message embedded in image: {}", output.display());
    Ok(EncodeReport {
        kind: MediaKind::Image,
        bits_embedded,
        carrier_units,
    })
}

/// Audio file -> PCM bytes -> embed -> WAV file.
///
/// A WAV input keeps its parameters; other formats are converted to 16-bit
/// PCM first.
pub fn encode_audio(input: &Path, output: &Path, message: &str, cfg: &StegoConfig) -> Result<EncodeReport> {
    audio::check_output_path(output)?;

    info!("loading audio: {}", input.display());
    let clip = audio::load(input, cfg).context("failed to read carrier audio")?;
    let carrier_units = clip.units();

    let (encoded, bits_embedded) = embed_medium(&PcmAdapter, &clip, message, cfg)?;

    audio::write_wav(&encoded, output).context("failed to write encoded audio")?;
    info!("message embedded in audio: {}", output.display());
    Ok(EncodeReport {
        kind: MediaKind::Audio,
        bits_embedded,
        carrier_units,
    })
}

/// Video file -> rgb24 frames -> embed frame by frame -> FFV1 video.
///
/// The capacity check runs on the probed frame count before ffmpeg starts,
/// so an oversized message never produces an output file.
pub fn encode_video(input: &Path, output: &Path, message: &str, cfg: &StegoConfig) -> Result<EncodeReport> {
    video::check_output_container(output)?;

    info!("probing video: {}", input.display());
    let shape = video::probe(&cfg.ffprobe, input, true)?;
    let carrier_units = shape.units();
    let embedder = Embedder::new(message, cfg.text_encoding, carrier_units)?;
    info!(
        "embedding {} bits into {} frames of {}x{}",
        embedder.total_bits(),
        shape.frame_count,
        shape.width,
        shape.height
    );

    let result = stream_frames(input, output, &embedder, &shape, cfg);
    if result.is_err() && output.exists() {
        warn!("removing incomplete output: {}", output.display());
        std::fs::remove_file(output).ok();
    }
    let bits_embedded = result?;

    info!("message embedded in video: {}", output.display());
    Ok(EncodeReport {
        kind: MediaKind::Video,
        bits_embedded,
        carrier_units,
    })
}

fn stream_frames(
    input: &Path,
    output: &Path,
    embedder: &Embedder,
    shape: &video::VideoShape,
    cfg: &StegoConfig,
) -> Result<usize> {
    let frame_size = shape.units_per_frame();
    let mut reader = VideoDecoder::new(cfg, shape).open(input)?;
    let audio_from = if cfg.keep_audio { Some(input) } else { None };
    let mut writer = VideoEncoder::new(cfg, shape).spawn(output, audio_from)?;

    let progress = frame_progress(shape.frame_count as u64, cfg.show_progress, "cyan/blue")?;

    // Read frames in batches (I/O must be sequential) and embed each batch in
    // parallel. Every frame covers its own bit range, so frames are
    // independent; memory stays bounded to `threads * frame_size`.
    let batch_size = rayon::current_num_threads();
    let mut offset = 0usize;
    let mut written = 0usize;

    loop {
        let mut batch: Vec<Vec<u8>> = Vec::with_capacity(batch_size);
        while batch.len() < batch_size {
            let mut frame = vec![0u8; frame_size];
            if !reader.read_frame(&mut frame)? {
                break;
            }
            batch.push(frame);
        }
        if batch.is_empty() {
            break;
        }

        written += batch
            .par_iter_mut()
            .enumerate()
            .map(|(i, frame)| embedder.embed_at(offset + i * frame_size, frame))
            .sum::<usize>();

        for frame in &batch {
            writer
                .write_frame(frame)
                .context("failed to write frame data to ffmpeg")?;
        }
        offset += batch.len() * frame_size;
        progress.inc(batch.len() as u64);
    }

    progress.finish_with_message("embedding complete");
    reader.finish()?;
    writer.finish()?;

    // The probe count was wrong and the stream ended early.
    if written < embedder.total_bits() {
        return Err(StegoError::CapacityExceeded {
            required: embedder.total_bits(),
            available: offset,
        }
        .into());
    }
    Ok(written)
}

pub(crate) fn frame_progress(frames: u64, visible: bool, colors: &str) -> Result<ProgressBar> {
    if !visible {
        return Ok(ProgressBar::hidden());
    }
    let progress = ProgressBar::new(frames);
    progress.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "[{{elapsed_precise}}] {{bar:40.{}}} {{pos}}/{{len}} frames ({{eta}})",
                colors
            ))?
            .progress_chars("##-"),
    );
    Ok(progress)
}

/// Dispatch on media kind.
pub fn encode_file(
    kind: MediaKind,
    input: &Path,
    output: &Path,
    message: &str,
    cfg: &StegoConfig,
) -> Result<EncodeReport> {
    let report = match kind {
        MediaKind::Image => encode_image(input, output, message, cfg)?,
        MediaKind::Audio => encode_audio(input, output, message, cfg)?,
        MediaKind::Video => encode_video(input, output, message, cfg)?,
    };
    info!(
        "{} carrier: {} of {} bytes used",
        report.kind, report.bits_embedded, report.carrier_units
    );
    Ok(report)
}

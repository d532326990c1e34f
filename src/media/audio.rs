use std::path::Path;
use std::process::{Command, Stdio};

use byteorder::{ByteOrder, LittleEndian};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{debug, info};

use crate::config::{self, StegoConfig};
use crate::media::{extension_of, Adapter, AdapterError};

/// Decoded PCM samples.
#[derive(Debug, Clone, PartialEq)]
pub enum PcmSamples {
    Int(Vec<i32>),
    Float(Vec<f32>),
}

impl PcmSamples {
    pub fn len(&self) -> usize {
        match self {
            Self::Int(s) => s.len(),
            Self::Float(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An interleaved PCM clip with its WAV parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    pub spec: WavSpec,
    pub samples: PcmSamples,
}

impl PcmClip {
    /// Carrier bytes this clip contributes.
    pub fn units(&self) -> usize {
        self.samples.len() * (self.spec.bits_per_sample as usize / 8)
    }

    pub fn duration_secs(&self) -> f64 {
        let frames = self.samples.len() / self.spec.channels.max(1) as usize;
        frames as f64 / self.spec.sample_rate as f64
    }
}

/// Parameters needed to rebuild a clip from its PCM bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmShape {
    pub spec: WavSpec,
}

impl PcmShape {
    pub fn bytes_per_sample(&self) -> usize {
        self.spec.bits_per_sample as usize / 8
    }
}

/// PCM audio as a carrier.
///
/// The carrier is the raw little-endian PCM byte buffer, so a 16-bit sample
/// contributes two carrier bytes. 8-bit PCM is stored unsigned on disk and
/// flattened the same way.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcmAdapter;

impl Adapter for PcmAdapter {
    type Medium = PcmClip;
    type Shape = PcmShape;

    fn flatten(&self, clip: &PcmClip) -> (Vec<u8>, PcmShape) {
        let shape = PcmShape { spec: clip.spec };
        let width = shape.bytes_per_sample();
        let mut units = vec![0u8; clip.samples.len() * width];

        match &clip.samples {
            PcmSamples::Int(samples) if width == 1 => {
                for (unit, &s) in units.iter_mut().zip(samples) {
                    *unit = (s + 128) as u8;
                }
            }
            PcmSamples::Int(samples) => {
                for (chunk, &s) in units.chunks_exact_mut(width).zip(samples) {
                    LittleEndian::write_int(chunk, i64::from(s), width);
                }
            }
            PcmSamples::Float(samples) => {
                LittleEndian::write_f32_into(samples, &mut units);
            }
        }

        (units, shape)
    }

    fn unflatten(&self, units: Vec<u8>, shape: &PcmShape) -> Result<PcmClip, AdapterError> {
        let width = shape.bytes_per_sample();
        if width == 0 || units.len() % width != 0 {
            return Err(AdapterError::ShapeMismatch {
                expected: units.len() - units.len() % width.max(1),
                got: units.len(),
            });
        }

        let samples = match shape.spec.sample_format {
            SampleFormat::Int if width == 1 => {
                PcmSamples::Int(units.iter().map(|&u| i32::from(u) - 128).collect())
            }
            SampleFormat::Int => PcmSamples::Int(
                units
                    .chunks_exact(width)
                    .map(|chunk| LittleEndian::read_int(chunk, width) as i32)
                    .collect(),
            ),
            SampleFormat::Float => {
                let mut samples = vec![0f32; units.len() / 4];
                LittleEndian::read_f32_into(&units, &mut samples);
                PcmSamples::Float(samples)
            }
        };

        Ok(PcmClip {
            spec: shape.spec,
            samples,
        })
    }
}

/// Load an audio carrier into memory.
///
/// WAV files are read as they are. Anything else is decoded by ffmpeg to
/// 16-bit PCM at its own sample rate and channel count, the same clip a WAV
/// conversion of the file would hold.
pub fn load(path: &Path, cfg: &StegoConfig) -> Result<PcmClip, AdapterError> {
    if config::WAV_EXTENSIONS.contains(&extension_of(path).as_str()) {
        read_wav(path)
    } else {
        transcode(path, cfg)
    }
}

/// Encoded audio is always written as WAV.
pub fn check_output_path(path: &Path) -> Result<(), AdapterError> {
    let ext = extension_of(path);
    if config::WAV_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(AdapterError::LossyOutput(format!(".{} (audio is written as .wav)", ext)))
    }
}

/// Decode the first audio stream of `path` to PCM through ffmpeg.
pub fn transcode(path: &Path, cfg: &StegoConfig) -> Result<PcmClip, AdapterError> {
    let (channels, sample_rate) = probe(&cfg.ffprobe, path)?;
    info!("converting {} to {}-bit PCM", path.display(), config::RAW_SAMPLE_BITS);

    let output = Command::new(&cfg.ffmpeg)
        .args(["-v", "error", "-i"])
        .arg(path)
        .args([
            "-map",
            "0:a:0",
            "-f",
            config::RAW_SAMPLE_FORMAT,
            "-acodec",
            "pcm_s16le",
            "-ac",
            &channels.to_string(),
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdin(Stdio::null())
        .output()
        .map_err(|e| AdapterError::Ffmpeg(format!("failed to run {} ({}); is ffmpeg installed?", cfg.ffmpeg, e)))?;
    if !output.status.success() {
        return Err(AdapterError::Ffmpeg(format!(
            "audio decode exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let clip = clip_from_s16le(&output.stdout, channels, sample_rate);
    debug!(
        "decoded {} samples ({:.2}s) from {}",
        clip.samples.len(),
        clip.duration_secs(),
        path.display()
    );
    Ok(clip)
}

/// Channel count and sample rate of the first audio stream.
fn probe(ffprobe: &str, path: &Path) -> Result<(u16, u32), AdapterError> {
    let output = Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=channels,sample_rate",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| AdapterError::Probe(format!("failed to run {} ({}); is ffmpeg installed?", ffprobe, e)))?;
    if !output.status.success() {
        return Err(AdapterError::Probe(format!(
            "{} exited with {}: {}",
            ffprobe,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_output(text: &str) -> Result<(u16, u32), AdapterError> {
    let mut channels = None;
    let mut sample_rate = None;
    for line in text.lines() {
        match line.trim().split_once('=') {
            Some(("channels", value)) => channels = value.parse::<u16>().ok(),
            Some(("sample_rate", value)) => sample_rate = value.parse::<u32>().ok(),
            _ => {}
        }
    }
    match (channels, sample_rate) {
        (Some(c), Some(r)) if c > 0 && r > 0 => Ok((c, r)),
        _ => Err(AdapterError::Probe("no audio stream found".to_string())),
    }
}

fn clip_from_s16le(bytes: &[u8], channels: u16, sample_rate: u32) -> PcmClip {
    // A trailing odd byte is not a sample.
    let mut samples = vec![0i16; bytes.len() / 2];
    LittleEndian::read_i16_into(&bytes[..samples.len() * 2], &mut samples);
    PcmClip {
        spec: WavSpec {
            channels,
            sample_rate,
            bits_per_sample: config::RAW_SAMPLE_BITS,
            sample_format: SampleFormat::Int,
        },
        samples: PcmSamples::Int(samples.into_iter().map(i32::from).collect()),
    }
}

/// Read a WAV file into memory.
pub fn read_wav(path: &Path) -> Result<PcmClip, AdapterError> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    check_spec(&spec)?;

    let samples = match spec.sample_format {
        SampleFormat::Int => PcmSamples::Int(reader.into_samples::<i32>().collect::<Result<_, _>>()?),
        SampleFormat::Float => {
            PcmSamples::Float(reader.into_samples::<f32>().collect::<Result<_, _>>()?)
        }
    };

    let clip = PcmClip { spec, samples };
    debug!(
        "read {} samples ({} ch, {} Hz, {} bit, {:.2}s)",
        clip.samples.len(),
        spec.channels,
        spec.sample_rate,
        spec.bits_per_sample,
        clip.duration_secs()
    );
    Ok(clip)
}

/// Write a clip to a WAV file with its original parameters.
pub fn write_wav(clip: &PcmClip, path: &Path) -> Result<(), AdapterError> {
    let mut writer = WavWriter::create(path, clip.spec)?;
    match &clip.samples {
        PcmSamples::Int(samples) => {
            for &s in samples {
                writer.write_sample(s)?;
            }
        }
        PcmSamples::Float(samples) => {
            for &s in samples {
                writer.write_sample(s)?;
            }
        }
    }
    writer.finalize()?;
    Ok(())
}

fn check_spec(spec: &WavSpec) -> Result<(), AdapterError> {
    let ok = match spec.sample_format {
        SampleFormat::Int => matches!(spec.bits_per_sample, 8 | 16 | 24 | 32),
        SampleFormat::Float => spec.bits_per_sample == 32,
    };
    if ok {
        Ok(())
    } else {
        Err(AdapterError::UnsupportedFormat(format!(
            "{}-bit {:?} PCM",
            spec.bits_per_sample, spec.sample_format
        )))
    }
}

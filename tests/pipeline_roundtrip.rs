use std::path::{Path, PathBuf};
use std::process::Command;

use hound::{SampleFormat, WavSpec, WavWriter};
use image::{Rgb, RgbImage};

use lsbsteg::{
    capacity, decode_file, encode_file, roundtrip, AdapterError, EncodeReport, MediaKind, NoopHook,
    PipelineHook, StegoConfig, StegoError, TextEncoding,
};

fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lsbsteg_it_{}", name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn quiet_config() -> StegoConfig {
    StegoConfig {
        show_progress: false,
        ..Default::default()
    }
}

fn write_test_png(path: &Path, width: u32, height: u32) {
    // All channels even, so the unmarked image has no LSB pattern at all.
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            ((x * 16) % 256) as u8,
            ((y * 8) % 256) as u8,
            (((x + y) * 4) % 256) as u8,
        ])
    });
    image.save(path).unwrap();
}

fn write_test_wav(path: &Path, samples: usize) {
    let spec = WavSpec {
        channels: 2,
        sample_rate: 22050,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec).unwrap();
    for i in 0..samples {
        let t = i as f64 / 22050.0;
        let s = (f64::sin(2.0 * std::f64::consts::PI * 330.0 * t) * 12000.0) as i16;
        writer.write_sample(s & !1).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn test_image_roundtrip() {
    let dir = test_dir("image");
    let input = dir.join("cover.png");
    let output = dir.join("encoded.png");
    write_test_png(&input, 64, 48);

    let cfg = quiet_config();
    let report = encode_file(MediaKind::Image, &input, &output, "Hidden in plain sight", &cfg).unwrap();
    assert_eq!(report.kind, MediaKind::Image);
    assert_eq!(report.bits_embedded, 21 * 8 + 16);
    assert_eq!(report.carrier_units, 64 * 48 * 3);

    let decoded = decode_file(MediaKind::Image, &output, &cfg).unwrap();
    assert_eq!(decoded, "Hidden in plain sight");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_image_pixels_after_payload_untouched() {
    let dir = test_dir("image_tail");
    let input = dir.join("cover.png");
    let output = dir.join("encoded.bmp");
    write_test_png(&input, 20, 20);

    encode_file(MediaKind::Image, &input, &output, "tail", &quiet_config()).unwrap();

    let before = image::open(&input).unwrap().to_rgb8().into_raw();
    let after = image::open(&output).unwrap().to_rgb8().into_raw();
    let used = 4 * 8 + 16;
    assert_eq!(&before[used..], &after[used..]);
    for (a, b) in before[..used].iter().zip(&after[..used]) {
        assert_eq!(a & 0xFE, b & 0xFE);
    }

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_image_too_small_writes_nothing() {
    let dir = test_dir("image_small");
    let input = dir.join("cover.png");
    let output = dir.join("encoded.png");
    write_test_png(&input, 2, 2);

    let err = encode_file(MediaKind::Image, &input, &output, "far too long", &quiet_config()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<StegoError>(),
        Some(&StegoError::CapacityExceeded {
            required: 12 * 8 + 16,
            available: 12,
        })
    );
    assert!(!output.exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_image_without_message() {
    let dir = test_dir("image_none");
    let input = dir.join("cover.png");
    write_test_png(&input, 32, 32);

    let err = decode_file(MediaKind::Image, &input, &quiet_config()).unwrap_err();
    assert_eq!(
        err.downcast_ref::<StegoError>(),
        Some(&StegoError::NoHiddenMessage)
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_missing_file_is_not_no_message() {
    let err = decode_file(
        MediaKind::Image,
        Path::new("/nonexistent/lsbsteg/cover.png"),
        &quiet_config(),
    )
    .unwrap_err();
    assert!(err.downcast_ref::<StegoError>().is_none());
    assert!(err.downcast_ref::<AdapterError>().is_some());
}

#[test]
fn test_audio_roundtrip() {
    let dir = test_dir("audio");
    let input = dir.join("tone.wav");
    let output = dir.join("encoded.wav");
    write_test_wav(&input, 4000);

    let cfg = quiet_config();
    let report = encode_file(MediaKind::Audio, &input, &output, "audio payload", &cfg).unwrap();
    assert_eq!(report.carrier_units, 4000 * 2);

    let decoded = decode_file(MediaKind::Audio, &output, &cfg).unwrap();
    assert_eq!(decoded, "audio payload");

    let before = hound::WavReader::open(&input).unwrap().spec();
    let after = hound::WavReader::open(&output).unwrap().spec();
    assert_eq!(before, after);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_audio_utf8_roundtrip() {
    let dir = test_dir("audio_utf8");
    let input = dir.join("tone.wav");
    let output = dir.join("encoded.wav");
    write_test_wav(&input, 2000);

    let cfg = StegoConfig {
        text_encoding: TextEncoding::Utf8,
        ..quiet_config()
    };
    encode_file(MediaKind::Audio, &input, &output, "naïve café ☕", &cfg).unwrap();
    assert_eq!(
        decode_file(MediaKind::Audio, &output, &cfg).unwrap(),
        "naïve café ☕"
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_wide_char_rejected_in_latin1() {
    let dir = test_dir("audio_wide");
    let input = dir.join("tone.wav");
    let output = dir.join("encoded.wav");
    write_test_wav(&input, 2000);

    let err = encode_file(MediaKind::Audio, &input, &output, "snow ☃", &quiet_config()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<StegoError>(),
        Some(StegoError::Encoding(_))
    ));
    assert!(!output.exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_capacity() {
    let dir = test_dir("capacity");
    let png = dir.join("cover.png");
    let wav = dir.join("tone.wav");
    write_test_png(&png, 10, 10);
    write_test_wav(&wav, 1000);

    let cfg = quiet_config();
    // 300 carrier bytes -> (300 - 16) / 8
    assert_eq!(capacity(MediaKind::Image, &png, &cfg).unwrap(), 35);
    // 1000 16-bit samples -> 2000 carrier bytes
    assert_eq!(capacity(MediaKind::Audio, &wav, &cfg).unwrap(), 248);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_roundtrip_with_noop_hook() {
    let dir = test_dir("roundtrip");
    let input = dir.join("cover.png");
    let encoded = dir.join("encoded.png");
    write_test_png(&input, 16, 16);

    let result = roundtrip(
        MediaKind::Image,
        &input,
        &encoded,
        "round and round",
        &quiet_config(),
        &NoopHook,
    )
    .unwrap();
    assert!(result.matched);
    assert_eq!(result.decoded, "round and round");

    std::fs::remove_dir_all(&dir).ok();
}

struct CopyHook;

impl PipelineHook for CopyHook {
    fn after_encode(&self, encoded_path: &Path, report: &EncodeReport) -> anyhow::Result<PathBuf> {
        assert_eq!(report.kind, MediaKind::Audio);
        let copy = encoded_path.with_file_name("transferred.wav");
        std::fs::copy(encoded_path, &copy)?;
        std::fs::remove_file(encoded_path)?;
        Ok(copy)
    }
}

#[test]
fn test_roundtrip_decodes_hook_path() {
    let dir = test_dir("roundtrip_hook");
    let input = dir.join("tone.wav");
    let encoded = dir.join("encoded.wav");
    write_test_wav(&input, 2000);

    let result = roundtrip(MediaKind::Audio, &input, &encoded, "moved", &quiet_config(), &CopyHook).unwrap();
    assert!(result.matched);
    assert_eq!(result.report.bits_embedded, 5 * 8 + 16);
    assert!(!encoded.exists());
    assert!(dir.join("transferred.wav").exists());

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_audio_output_must_be_wav() {
    let dir = test_dir("audio_lossy_out");
    let input = dir.join("tone.wav");
    let output = dir.join("encoded.mp3");
    write_test_wav(&input, 2000);

    let err = encode_file(MediaKind::Audio, &input, &output, "no", &quiet_config()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<AdapterError>(),
        Some(AdapterError::LossyOutput(_))
    ));
    assert!(!output.exists());

    std::fs::remove_dir_all(&dir).ok();
}

fn ffmpeg_available() -> bool {
    Command::new("ffmpeg").arg("-version").output().is_ok()
        && Command::new("ffprobe").arg("-version").output().is_ok()
}

#[test]
fn test_flac_input_encodes_to_wav() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg/ffprobe not found, skipping");
        return;
    }
    let dir = test_dir("audio_flac");
    let wav = dir.join("tone.wav");
    let input = dir.join("tone.flac");
    let output = dir.join("encoded.wav");
    write_test_wav(&wav, 4000);

    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-i"])
        .arg(&wav)
        .arg(&input)
        .status()
        .unwrap();
    assert!(status.success());

    let cfg = quiet_config();
    // FLAC is lossless, so the converted clip has the same 16-bit samples.
    assert_eq!(capacity(MediaKind::Audio, &input, &cfg).unwrap(), (4000 * 2 - 16) / 8);

    let report = encode_file(MediaKind::Audio, &input, &output, "from flac", &cfg).unwrap();
    assert_eq!(report.carrier_units, 4000 * 2);
    assert_eq!(decode_file(MediaKind::Audio, &output, &cfg).unwrap(), "from flac");

    let spec = hound::WavReader::open(&output).unwrap().spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 22050);
    assert_eq!(spec.bits_per_sample, 16);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_video_roundtrip() {
    if !ffmpeg_available() {
        eprintln!("ffmpeg/ffprobe not found, skipping");
        return;
    }
    let dir = test_dir("video");
    let input = dir.join("source.mkv");
    let output = dir.join("encoded.mkv");

    let status = Command::new("ffmpeg")
        .args(["-y", "-v", "error", "-f", "lavfi", "-i", "testsrc=size=64x48:rate=10:duration=1"])
        .args(["-c:v", "ffv1"])
        .arg(&input)
        .status()
        .unwrap();
    assert!(status.success());

    let cfg = quiet_config();
    // Longer than one frame (64 * 48 * 3 bits) so the payload spans frames.
    let message: String = "frame by frame ".repeat(100);
    let report = encode_file(MediaKind::Video, &input, &output, &message, &cfg).unwrap();
    assert!(report.bits_embedded > 64 * 48 * 3);

    let decoded = decode_file(MediaKind::Video, &output, &cfg).unwrap();
    assert_eq!(decoded, message);

    std::fs::remove_dir_all(&dir).ok();
}

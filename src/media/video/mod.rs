pub mod decoder;
pub mod encoder;

use std::path::Path;
use std::process::{Command, Stdio};

use ::image::RgbImage;
use log::debug;

use crate::config;
use crate::media::image::{ImageAdapter, ImageShape};
use crate::media::{extension_of, Adapter, AdapterError};

/// Stream parameters needed to rebuild a video from its carrier bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoShape {
    pub width: u32,
    pub height: u32,
    /// Frame rate as ffmpeg prints it, e.g. `30000/1001`.
    pub frame_rate: String,
    pub frame_count: usize,
}

impl VideoShape {
    pub fn frame_shape(&self) -> ImageShape {
        ImageShape {
            width: self.width,
            height: self.height,
        }
    }

    pub fn units_per_frame(&self) -> usize {
        config::units_per_frame(self.width, self.height)
    }

    /// Total carrier bytes across all frames.
    pub fn units(&self) -> usize {
        self.units_per_frame() * self.frame_count
    }
}

/// A fully decoded video held in memory.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoClip {
    pub frames: Vec<RgbImage>,
    pub frame_rate: String,
}

/// Every frame is flattened with [`ImageAdapter`] and frames are concatenated
/// in arrival order. The ffmpeg `rgb24` raw frames used for files have the
/// same byte layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct VideoAdapter;

impl Adapter for VideoAdapter {
    type Medium = VideoClip;
    type Shape = VideoShape;

    fn flatten(&self, clip: &VideoClip) -> (Vec<u8>, VideoShape) {
        let (width, height) = clip.frames.first().map_or((0, 0), |f| f.dimensions());
        let mut units = Vec::with_capacity(config::units_per_frame(width, height) * clip.frames.len());
        for frame in &clip.frames {
            let (frame_units, _) = ImageAdapter.flatten(frame);
            units.extend_from_slice(&frame_units);
        }
        let shape = VideoShape {
            width,
            height,
            frame_rate: clip.frame_rate.clone(),
            frame_count: clip.frames.len(),
        };
        (units, shape)
    }

    fn unflatten(&self, units: Vec<u8>, shape: &VideoShape) -> Result<VideoClip, AdapterError> {
        if units.len() != shape.units() {
            return Err(AdapterError::ShapeMismatch {
                expected: shape.units(),
                got: units.len(),
            });
        }
        let frame_shape = shape.frame_shape();
        let per_frame = shape.units_per_frame().max(1);
        let frames = units
            .chunks(per_frame)
            .map(|chunk| ImageAdapter.unflatten(chunk.to_vec(), &frame_shape))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VideoClip {
            frames,
            frame_rate: shape.frame_rate.clone(),
        })
    }
}

/// Refuse output containers that cannot carry an FFV1 stream.
pub fn check_output_container(path: &Path) -> Result<(), AdapterError> {
    let ext = extension_of(path);
    if config::LOSSLESS_VIDEO_CONTAINERS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(AdapterError::LossyOutput(format!(
            ".{} (use one of: {})",
            ext,
            config::LOSSLESS_VIDEO_CONTAINERS.join(", ")
        )))
    }
}

/// Query the first video stream of `input` with ffprobe.
///
/// With `count_frames` the stream is decoded once to get an exact frame
/// count, which is required before embedding.
pub fn probe(ffprobe: &str, input: &Path, count_frames: bool) -> Result<VideoShape, AdapterError> {
    let mut cmd = Command::new(ffprobe);
    cmd.args(["-v", "error", "-select_streams", "v:0"]);
    if count_frames {
        cmd.arg("-count_frames");
    }
    cmd.args([
        "-show_entries",
        "stream=width,height,r_frame_rate,nb_frames,nb_read_frames",
        "-of",
        "default=noprint_wrappers=1",
    ])
    .arg(input)
    .stdin(Stdio::null());

    let output = cmd
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

    let shape = parse_probe_output(&String::from_utf8_lossy(&output.stdout), count_frames)?;
    debug!(
        "probed {}: {}x{} @ {} fps, {} frames",
        input.display(),
        shape.width,
        shape.height,
        shape.frame_rate,
        shape.frame_count
    );
    Ok(shape)
}

fn parse_probe_output(text: &str, require_count: bool) -> Result<VideoShape, AdapterError> {
    let mut width = None;
    let mut height = None;
    let mut frame_rate = None;
    let mut nb_frames = None;
    let mut nb_read_frames = None;

    for line in text.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "width" => width = value.parse::<u32>().ok(),
            "height" => height = value.parse::<u32>().ok(),
            "r_frame_rate" => frame_rate = Some(value.to_string()),
            "nb_frames" => nb_frames = value.parse::<usize>().ok(),
            "nb_read_frames" => nb_read_frames = value.parse::<usize>().ok(),
            _ => {}
        }
    }

    let (width, height) = match (width, height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(AdapterError::Probe("no video stream found".to_string())),
    };
    let frame_count = match nb_read_frames.or(nb_frames) {
        Some(n) => n,
        None if require_count => {
            return Err(AdapterError::Probe("frame count unavailable".to_string()))
        }
        None => 0,
    };

    Ok(VideoShape {
        width,
        height,
        frame_rate: frame_rate.unwrap_or_else(|| "25/1".to_string()),
        frame_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ::image::Rgb;

    #[test]
    fn test_parse_probe_output() {
        let text = "width=640\nheight=360\nr_frame_rate=30000/1001\nnb_frames=N/A\nnb_read_frames=91\n";
        let shape = parse_probe_output(text, true).unwrap();
        assert_eq!(
            shape,
            VideoShape {
                width: 640,
                height: 360,
                frame_rate: "30000/1001".to_string(),
                frame_count: 91,
            }
        );
        assert_eq!(shape.units(), 640 * 360 * 3 * 91);
    }

    #[test]
    fn test_parse_probe_output_falls_back_to_nb_frames() {
        let text = "width=4\nheight=2\nr_frame_rate=25/1\nnb_frames=10\nnb_read_frames=N/A\n";
        assert_eq!(parse_probe_output(text, true).unwrap().frame_count, 10);
    }

    #[test]
    fn test_parse_probe_output_missing_count() {
        let text = "width=4\nheight=2\nr_frame_rate=25/1\nnb_frames=N/A\n";
        assert!(matches!(
            parse_probe_output(text, true),
            Err(AdapterError::Probe(_))
        ));
        assert_eq!(parse_probe_output(text, false).unwrap().frame_count, 0);
    }

    #[test]
    fn test_parse_probe_output_no_stream() {
        assert!(parse_probe_output("", false).is_err());
    }

    #[test]
    fn test_check_output_container() {
        assert!(check_output_container(Path::new("out.mkv")).is_ok());
        assert!(check_output_container(Path::new("out.AVI")).is_ok());
        assert!(matches!(
            check_output_container(Path::new("out.mp4")),
            Err(AdapterError::LossyOutput(_))
        ));
    }

    #[test]
    fn test_flatten_concatenates_frames_in_order() {
        let a = RgbImage::from_pixel(2, 1, Rgb([1, 2, 3]));
        let b = RgbImage::from_pixel(2, 1, Rgb([9, 8, 7]));
        let clip = VideoClip {
            frames: vec![a, b],
            frame_rate: "24/1".to_string(),
        };
        let (units, shape) = VideoAdapter.flatten(&clip);
        assert_eq!(units, vec![1, 2, 3, 1, 2, 3, 9, 8, 7, 9, 8, 7]);
        assert_eq!(shape.frame_count, 2);

        let rebuilt = VideoAdapter.unflatten(units, &shape).unwrap();
        assert_eq!(rebuilt, clip);
    }

    #[test]
    fn test_unflatten_rejects_short_stream() {
        let shape = VideoShape {
            width: 2,
            height: 2,
            frame_rate: "25/1".to_string(),
            frame_count: 3,
        };
        assert!(matches!(
            VideoAdapter.unflatten(vec![0u8; 20], &shape),
            Err(AdapterError::ShapeMismatch { expected: 36, got: 20 })
        ));
    }
}

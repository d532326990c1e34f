use std::io::Write;
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};

use log::info;

use crate::config::{self, StegoConfig};
use crate::media::video::VideoShape;
use crate::media::AdapterError;

/// Writes raw `rgb24` frames into a losslessly encoded video file.
///
/// Uses the ffmpeg CLI; frames are piped to its stdin in arrival order.
pub struct VideoEncoder {
    ffmpeg: String,
    codec: String,
    shape: VideoShape,
}

impl VideoEncoder {
    pub fn new(cfg: &StegoConfig, shape: &VideoShape) -> Self {
        Self {
            ffmpeg: cfg.ffmpeg.clone(),
            codec: cfg.video_codec.clone(),
            shape: shape.clone(),
        }
    }

    /// Start ffmpeg writing to `output_path`. If `audio_from` is given, its
    /// audio streams (if any) are copied into the output untouched.
    pub fn spawn(&self, output_path: &Path, audio_from: Option<&Path>) -> Result<FrameWriter, AdapterError> {
        info!(
            "encoding {}x{} @ {} fps with {} into {}",
            self.shape.width,
            self.shape.height,
            self.shape.frame_rate,
            self.codec,
            output_path.display()
        );

        // Scale FFV1 slice count to available threads for better intra-frame
        // parallelism inside ffmpeg. Clamped to 16 (a reasonable FFV1 upper bound).
        let ffv1_slices = rayon::current_num_threads().min(16).to_string();

        let mut cmd = Command::new(&self.ffmpeg);
        cmd.args([
            "-y",
            "-v",
            "error",
            "-f",
            "rawvideo",
            "-pixel_format",
            config::RAW_PIXEL_FORMAT,
            "-video_size",
            &format!("{}x{}", self.shape.width, self.shape.height),
            "-framerate",
            &self.shape.frame_rate,
            "-i",
            "pipe:0",
        ]);
        if let Some(source) = audio_from {
            cmd.arg("-i")
                .arg(source)
                .args(["-map", "0:v:0", "-map", "1:a?", "-c:a", "copy"]);
        }
        cmd.args(["-c:v", &self.codec]);
        if self.codec == config::DEFAULT_VIDEO_CODEC {
            cmd.args(["-level", "3", "-slices", &ffv1_slices, "-slicecrc", "1"]);
        }
        // Packed 8-bit RGB so ffmpeg never converts to YUV.
        cmd.args(["-pix_fmt", "bgr0"])
            .arg(output_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = cmd
            .spawn()
            .map_err(|e| AdapterError::Ffmpeg(format!("failed to spawn {} ({}); is ffmpeg installed?", self.ffmpeg, e)))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| AdapterError::Ffmpeg("ffmpeg stdin unavailable".to_string()))?;

        Ok(FrameWriter {
            child,
            stdin: Some(stdin),
            frame_size: self.shape.units_per_frame(),
            frames_written: 0,
        })
    }
}

/// A running ffmpeg encode accepting raw frames.
pub struct FrameWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    frame_size: usize,
    frames_written: u64,
}

impl FrameWriter {
    pub fn write_frame(&mut self, frame: &[u8]) -> Result<(), AdapterError> {
        if frame.len() != self.frame_size {
            return Err(AdapterError::ShapeMismatch {
                expected: self.frame_size,
                got: frame.len(),
            });
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| AdapterError::Ffmpeg("ffmpeg stdin already closed".to_string()))?;
        stdin.write_all(frame)?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Close the pipe and wait for ffmpeg to finish the file.
    pub fn finish(mut self) -> Result<(), AdapterError> {
        drop(self.stdin.take());
        let status = self.child.wait()?;
        if !status.success() {
            return Err(AdapterError::Ffmpeg(format!("encoder exited with status: {}", status)));
        }
        info!("video encoding complete: {} frames", self.frames_written);
        Ok(())
    }
}

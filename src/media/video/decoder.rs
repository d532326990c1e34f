use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use log::{debug, info};

use crate::config::{self, StegoConfig};
use crate::media::video::VideoShape;
use crate::media::AdapterError;

/// Reads any ffmpeg-decodable video as a stream of raw `rgb24` frames.
pub struct VideoDecoder {
    ffmpeg: String,
    shape: VideoShape,
}

impl VideoDecoder {
    pub fn new(cfg: &StegoConfig, shape: &VideoShape) -> Self {
        Self {
            ffmpeg: cfg.ffmpeg.clone(),
            shape: shape.clone(),
        }
    }

    pub fn frame_size(&self) -> usize {
        self.shape.units_per_frame()
    }

    /// Start ffmpeg decoding `input_path` to raw frames on its stdout.
    pub fn open(&self, input_path: &Path) -> Result<FrameReader, AdapterError> {
        info!("decoding video: {}", input_path.display());

        let mut child = Command::new(&self.ffmpeg)
            .args(["-v", "error", "-i"])
            .arg(input_path)
            .args([
                "-map",
                "0:v:0",
                // One output frame per decoded frame, no duplication or drops.
                "-vsync",
                "0",
                "-f",
                "rawvideo",
                "-pix_fmt",
                config::RAW_PIXEL_FORMAT,
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AdapterError::Ffmpeg(format!("failed to spawn {} ({}); is ffmpeg installed?", self.ffmpeg, e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AdapterError::Ffmpeg("ffmpeg stdout unavailable".to_string()))?;

        Ok(FrameReader {
            child,
            stdout,
            frame_size: self.frame_size(),
            frames_read: 0,
        })
    }
}

/// A running ffmpeg decode yielding raw frames in arrival order.
pub struct FrameReader {
    child: Child,
    stdout: ChildStdout,
    frame_size: usize,
    frames_read: u64,
}

impl FrameReader {
    /// Fill `buf` with the next frame. Returns `Ok(false)` at end of stream.
    pub fn read_frame(&mut self, buf: &mut [u8]) -> Result<bool, AdapterError> {
        if buf.len() != self.frame_size {
            return Err(AdapterError::ShapeMismatch {
                expected: self.frame_size,
                got: buf.len(),
            });
        }
        let more = read_exact_or_eof(&mut self.stdout, buf)?;
        if more {
            self.frames_read += 1;
        }
        Ok(more)
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Wait for ffmpeg after the stream has been read to the end.
    pub fn finish(mut self) -> Result<(), AdapterError> {
        let status = self.child.wait()?;
        if !status.success() {
            return Err(AdapterError::Ffmpeg(format!("decoder exited with status: {}", status)));
        }
        info!("decoded {} frames", self.frames_read);
        Ok(())
    }

    /// Stop decoding early and reap the ffmpeg process.
    pub fn abort(mut self) -> Result<(), AdapterError> {
        debug!("stopping decoder after {} frames", self.frames_read);
        // Already exited is fine.
        let _ = self.child.kill();
        self.child.wait()?;
        Ok(())
    }
}

/// Read exactly `buf.len()` bytes, returning Ok(false) on clean EOF.
fn read_exact_or_eof(reader: &mut impl std::io::Read, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => {
                if filled == 0 {
                    return Ok(false);
                } else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "partial frame read",
                    ));
                }
            }
            Ok(n) => filled += n,
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_exact_or_eof_full_frames() {
        let mut reader = Cursor::new(vec![1u8, 2, 3, 4, 5, 6]);
        let mut buf = [0u8; 3];
        assert!(read_exact_or_eof(&mut reader, &mut buf).unwrap());
        assert_eq!(buf, [1, 2, 3]);
        assert!(read_exact_or_eof(&mut reader, &mut buf).unwrap());
        assert_eq!(buf, [4, 5, 6]);
        assert!(!read_exact_or_eof(&mut reader, &mut buf).unwrap());
    }

    #[test]
    fn test_read_exact_or_eof_partial_frame() {
        let mut reader = Cursor::new(vec![1u8, 2]);
        let mut buf = [0u8; 3];
        let err = read_exact_or_eof(&mut reader, &mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}

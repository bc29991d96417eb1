//! MP4 clip assembly from a JPEG frame sequence.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};

/// Assembles JPEG frame sequences into MP4 clips via FFmpeg's image2pipe
/// demuxer.
#[derive(Debug, Clone)]
pub struct ClipEncoder {
    ffmpeg: PathBuf,
}

impl ClipEncoder {
    /// Create an encoder, locating `ffmpeg` in PATH.
    pub fn new() -> MediaResult<Self> {
        let ffmpeg = which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;
        debug!(ffmpeg = %ffmpeg.display(), "FFmpeg located");
        Ok(Self { ffmpeg })
    }

    /// Create an encoder with an explicit FFmpeg binary path.
    pub fn with_binary(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// Encode `frames` (JPEG bytes, arrival order) covering
    /// `duration_seconds` of wall time into an MP4 at `output`.
    ///
    /// The input frame rate is derived from the frame count and the covered
    /// duration so the clip plays back in real time regardless of detector
    /// throughput.
    pub async fn encode_clip(
        &self,
        frames: &[Vec<u8>],
        duration_seconds: f64,
        output: &Path,
    ) -> MediaResult<()> {
        if frames.is_empty() {
            return Err(MediaError::EmptyClip);
        }

        let framerate = derived_framerate(frames.len(), duration_seconds);
        let args = encode_args(framerate, output);
        debug!(
            frames = frames.len(),
            framerate,
            output = %output.display(),
            "Encoding clip"
        );

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Stream frames into the demuxer, then close stdin so FFmpeg
        // finalizes the container.
        {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| MediaError::ffmpeg_failed("failed to open stdin", None, None))?;
            for frame in frames {
                stdin.write_all(frame).await?;
            }
            stdin.shutdown().await?;
        }

        let result = child.wait_with_output().await?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).to_string();
            warn!(exit = ?result.status.code(), "FFmpeg clip encode failed");
            return Err(MediaError::ffmpeg_failed(
                "clip encode failed",
                Some(stderr),
                result.status.code(),
            ));
        }

        Ok(())
    }
}

/// Input frame rate derived from count and covered duration, floored at 1.
fn derived_framerate(frame_count: usize, duration_seconds: f64) -> u32 {
    if duration_seconds <= 0.0 {
        return 1;
    }
    ((frame_count as f64 / duration_seconds).round() as u32).max(1)
}

/// Argument list for a JPEG-pipe to MP4 encode.
fn encode_args(framerate: u32, output: &Path) -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-y".to_string(),
        "-f".to_string(),
        "image2pipe".to_string(),
        "-framerate".to_string(),
        framerate.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        output.display().to_string(),
    ]
}

//! Clip artifact persistence.
//!
//! The session accumulates the JPEG frames of each long interval and hands
//! them to an `ArtifactSink`, which turns them into a durable reference
//! (the public URL of an uploaded MP4). Encoding and uploading run in the
//! background; the session consumes the returned reference at the next
//! interval boundary.

use async_trait::async_trait;
use tracing::{debug, info};

use optrack_media::ClipEncoder;
use optrack_storage::{clip_key, R2Client};

use crate::error::ServerResult;

/// Persists one interval's worth of frames and returns an artifact reference.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Encode `frames` (JPEG bytes, capture order) covering
    /// `duration_seconds` of wall time and persist the result.
    ///
    /// Returns the artifact reference, or an empty string when the sink
    /// does not produce one.
    async fn persist_clip(
        &self,
        frames: Vec<Vec<u8>>,
        duration_seconds: f64,
        sequence: u64,
    ) -> ServerResult<String>;
}

/// Encodes frames to MP4 with FFmpeg and uploads the clip to R2.
pub struct ClipSink {
    encoder: ClipEncoder,
    storage: R2Client,
    session_id: String,
}

impl ClipSink {
    pub fn new(encoder: ClipEncoder, storage: R2Client, session_id: impl Into<String>) -> Self {
        Self {
            encoder,
            storage,
            session_id: session_id.into(),
        }
    }
}

#[async_trait]
impl ArtifactSink for ClipSink {
    async fn persist_clip(
        &self,
        frames: Vec<Vec<u8>>,
        duration_seconds: f64,
        sequence: u64,
    ) -> ServerResult<String> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join(format!("clip-{sequence:06}.mp4"));

        debug!(sequence, frames = frames.len(), "Encoding clip artifact");
        self.encoder
            .encode_clip(&frames, duration_seconds, &output)
            .await?;

        let key = clip_key(&self.session_id, sequence);
        let url = self.storage.upload_file(&output, &key, "video/mp4").await?;
        info!(sequence, %url, "Persisted clip artifact");
        Ok(url)
    }
}

/// Discards frames and returns no reference. Used when storage or FFmpeg
/// is not configured; reports then keep whatever references already exist.
pub struct NullSink;

#[async_trait]
impl ArtifactSink for NullSink {
    async fn persist_clip(
        &self,
        _frames: Vec<Vec<u8>>,
        _duration_seconds: f64,
        sequence: u64,
    ) -> ServerResult<String> {
        debug!(sequence, "Artifact persistence disabled, dropping clip");
        Ok(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_sink_returns_empty_reference() {
        let url = NullSink
            .persist_clip(vec![vec![1, 2, 3]], 5.0, 0)
            .await
            .unwrap();
        assert!(url.is_empty());
    }
}

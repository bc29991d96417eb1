//! Frame acquisition.
//!
//! The pipeline pulls frames rather than having them pushed: the session
//! loop asks the source for the next frame and the source paces itself to
//! the configured frame rate.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

use optrack_vision::Frame;

use crate::error::{frame_read_error, ServerResult};

/// A pull-based source of video frames.
///
/// `next_frame` returns `Ok(None)` when the source is exhausted, which ends
/// the session cleanly. Transient failures return `Err`; the session decides
/// how many of those in a row it tolerates.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> ServerResult<Option<Frame>>;
}

/// Fetches JPEG frames from an HTTP capture endpoint at a fixed rate.
pub struct HttpFrameSource {
    http: reqwest::Client,
    url: String,
    interval: Duration,
    next_index: u64,
    last_fetch: Option<Instant>,
}

impl HttpFrameSource {
    pub fn new(url: impl Into<String>, frame_rate: u32) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            interval: Duration::from_secs_f64(1.0 / frame_rate.max(1) as f64),
            next_index: 0,
            last_fetch: None,
        }
    }
}

#[async_trait]
impl FrameSource for HttpFrameSource {
    async fn next_frame(&mut self) -> ServerResult<Option<Frame>> {
        // Pace requests so a fast endpoint does not flood the pipeline.
        if let Some(last) = self.last_fetch {
            tokio::time::sleep_until(last + self.interval).await;
        }
        self.last_fetch = Some(Instant::now());

        let index = self.next_index;
        self.next_index += 1;

        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(|e| frame_read_error(format!("Frame fetch failed: {e}")))?;
        if !response.status().is_success() {
            return Err(frame_read_error(format!(
                "Frame endpoint returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| frame_read_error(format!("Frame body read failed: {e}")))?;

        debug!(index, size = bytes.len(), "Fetched frame");
        let frame = Frame::from_jpeg(index, bytes.to_vec())
            .map_err(|e| frame_read_error(format!("Frame decode failed: {e}")))?;
        Ok(Some(frame))
    }
}

/// Replays a fixed sequence of frames, then reports exhaustion.
pub struct StubFrameSource {
    frames: VecDeque<Frame>,
}

impl StubFrameSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

#[async_trait]
impl FrameSource for StubFrameSource {
    async fn next_frame(&mut self) -> ServerResult<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn solid_frame(index: u64, width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let image = image::RgbImage::from_pixel(width, height, image::Rgb(rgb));
        Frame::from_image(index, image).unwrap()
    }

    fn jpeg_bytes() -> Vec<u8> {
        solid_frame(0, 8, 8, [10, 20, 30]).jpeg().to_vec()
    }

    #[tokio::test]
    async fn test_http_source_decodes_frames_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/frame"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(jpeg_bytes()))
            .mount(&server)
            .await;

        let mut source = HttpFrameSource::new(format!("{}/frame", server.uri()), 100);
        let first = source.next_frame().await.unwrap().unwrap();
        let second = source.next_frame().await.unwrap().unwrap();
        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert_eq!(first.width(), 8);
    }

    #[tokio::test]
    async fn test_http_source_surfaces_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/frame"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut source = HttpFrameSource::new(format!("{}/frame", server.uri()), 100);
        let err = source.next_frame().await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn test_http_source_rejects_non_jpeg_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/frame"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"not a jpeg".to_vec()))
            .mount(&server)
            .await;

        let mut source = HttpFrameSource::new(format!("{}/frame", server.uri()), 100);
        assert!(source.next_frame().await.is_err());
    }

    #[tokio::test]
    async fn test_stub_source_exhausts() {
        let frame = solid_frame(5, 4, 4, [0, 0, 0]);
        let mut source = StubFrameSource::new([frame]);
        assert!(source.next_frame().await.unwrap().is_some());
        assert!(source.next_frame().await.unwrap().is_none());
    }
}

//! Frame and per-frame detection result types.

use chrono::{DateTime, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;

use optrack_models::Detection;

use crate::error::{VisionError, VisionResult};

/// JPEG quality for relayed/persisted frames.
const JPEG_QUALITY: u8 = 80;

/// One captured video frame.
///
/// Carries both the decoded pixels (mask sampling) and the JPEG encoding
/// (subscriber relay, clip assembly) so neither is computed twice.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Monotonic capture index within the session.
    pub index: u64,
    /// Capture timestamp.
    pub captured_at: DateTime<Utc>,
    image: RgbImage,
    jpeg: Vec<u8>,
}

impl Frame {
    /// Create a frame from decoded pixels, encoding the JPEG copy.
    pub fn from_image(index: u64, image: RgbImage) -> VisionResult<Self> {
        let mut jpeg = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
        encoder.encode_image(&image)?;
        Ok(Self {
            index,
            captured_at: Utc::now(),
            image,
            jpeg,
        })
    }

    /// Create a frame from JPEG bytes, decoding the pixel copy.
    pub fn from_jpeg(index: u64, jpeg: Vec<u8>) -> VisionResult<Self> {
        if jpeg.is_empty() {
            return Err(VisionError::invalid_frame("empty JPEG payload"));
        }
        let image = image::load_from_memory(&jpeg)?.to_rgb8();
        Ok(Self {
            index,
            captured_at: Utc::now(),
            image,
            jpeg,
        })
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Decoded pixel data.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// JPEG encoding of this frame.
    pub fn jpeg(&self) -> &[u8] {
        &self.jpeg
    }
}

/// Detections for one processed frame, in detector output order.
///
/// Owned by the detection buffer until the window is drained; at most one
/// `FrameResult` exists per processed frame.
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: Frame,
    pub detections: Vec<Detection>,
}

impl FrameResult {
    /// Pair a frame with its detections.
    pub fn new(frame: Frame, detections: Vec<Detection>) -> Self {
        Self { frame, detections }
    }

    /// A frame whose detection pass failed or returned nothing.
    pub fn empty(frame: Frame) -> Self {
        Self {
            frame,
            detections: Vec::new(),
        }
    }
}

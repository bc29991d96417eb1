//! Error types for the vision pipeline.

use thiserror::Error;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur during detection and placement.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Detection failed: {0}")]
    DetectionFailed(String),

    #[error("Placement classification failed: {0}")]
    PlacementFailed(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl VisionError {
    pub fn detection_failed(msg: impl Into<String>) -> Self {
        Self::DetectionFailed(msg.into())
    }

    pub fn placement_failed(msg: impl Into<String>) -> Self {
        Self::PlacementFailed(msg.into())
    }

    pub fn invalid_frame(msg: impl Into<String>) -> Self {
        Self::InvalidFrame(msg.into())
    }
}

//! Detection buffer for the current consensus window.

use crate::frame::FrameResult;

/// Accumulates frame results between window resets.
///
/// Append-only in arrival order; `drain` hands the whole window to the
/// consensus selector and leaves the buffer empty. No frame survives a drain.
#[derive(Debug, Default)]
pub struct DetectionBuffer {
    frames: Vec<FrameResult>,
}

impl DetectionBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame result. O(1), no validation.
    pub fn push(&mut self, result: FrameResult) {
        self.frames.push(result);
    }

    /// Take the accumulated window and clear the buffer.
    pub fn drain(&mut self) -> Vec<FrameResult> {
        std::mem::take(&mut self.frames)
    }

    /// Number of frames in the current window.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the current window is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

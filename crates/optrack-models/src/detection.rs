//! Raw detector output types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tool::ToolClass;

/// Axis-aligned bounding box in pixel coordinates.
///
/// Corners are `(x1, y1)` top-left and `(x2, y2)` bottom-right, in the
/// coordinate space of the frame the detection belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Create a new bounding box.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Clamp both corners to the frame's pixel bounds.
    ///
    /// Detectors occasionally emit coordinates a pixel or two outside the
    /// frame; placement sampling requires in-bounds corners.
    pub fn clamped(&self, width: u32, height: u32) -> Self {
        let max_x = width.saturating_sub(1) as f32;
        let max_y = height.saturating_sub(1) as f32;
        Self {
            x1: self.x1.clamp(0.0, max_x),
            y1: self.y1.clamp(0.0, max_y),
            x2: self.x2.clamp(0.0, max_x),
            y2: self.y2.clamp(0.0, max_y),
        }
    }

    /// Width of the box.
    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }
}

/// One detection produced by the object detector for one frame.
///
/// Plain immutable value record; no behavior beyond accessors. A frame owns
/// its detections until the window they belong to is drained.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Detection {
    /// The tool class the detector labeled this box with.
    pub tool: ToolClass,
    /// Detection confidence in `[0, 1]`.
    pub confidence: f32,
    /// Bounding box in frame pixel coordinates.
    pub bbox: BoundingBox,
}

impl Detection {
    /// Create a new detection.
    pub fn new(tool: ToolClass, confidence: f32, bbox: BoundingBox) -> Self {
        Self { tool, confidence, bbox }
    }

    /// Validate a raw detector row into a detection.
    ///
    /// Out-of-range class ids and non-finite confidences drop the single
    /// detection; the frame and window proceed without it.
    pub fn from_raw(class_id: usize, confidence: f32, bbox: BoundingBox) -> Option<Self> {
        if !confidence.is_finite() {
            return None;
        }
        let tool = ToolClass::from_class_id(class_id)?;
        Some(Self {
            tool,
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_clamp() {
        let bbox = BoundingBox::new(-4.0, 10.0, 700.0, 500.0);
        let clamped = bbox.clamped(640, 480);
        assert_eq!(clamped.x1, 0.0);
        assert_eq!(clamped.y1, 10.0);
        assert_eq!(clamped.x2, 639.0);
        assert_eq!(clamped.y2, 479.0);
    }

    #[test]
    fn test_from_raw_drops_unknown_class() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(Detection::from_raw(1, 0.8, bbox).is_some());
        assert!(Detection::from_raw(7, 0.8, bbox).is_none());
    }

    #[test]
    fn test_from_raw_drops_non_finite_confidence() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        assert!(Detection::from_raw(0, f32::NAN, bbox).is_none());
        let clamped = Detection::from_raw(0, 1.5, bbox).unwrap();
        assert_eq!(clamped.confidence, 1.0);
    }
}

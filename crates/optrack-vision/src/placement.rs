//! Placement classification strategies.
//!
//! Both strategies answer the same question for a representative frame: for
//! every tracked tool, is it in place, out of place, or missing? The mask
//! strategy samples the frame's color mask at the bounding-box corners; the
//! semantic strategy (see `optrack-ml-client`) delegates to a vision-language
//! model. Callers see an identical contract and choose by configuration.

use std::collections::BTreeMap;

use async_trait::async_trait;
use optrack_models::{Detection, PlacementStatus, ToolClass};
use tracing::debug;

use crate::error::VisionResult;
use crate::frame::Frame;
use crate::mask::{HsvRange, PlacementMask};

/// Placement result per tool class, in fixed class order.
pub type StatusMap = BTreeMap<ToolClass, PlacementStatus>;

/// A placement-decision backend.
#[async_trait]
pub trait PlacementStrategy: Send + Sync {
    /// Classify every tracked tool for one frame.
    ///
    /// `detections` are the representative frame's detections in detector
    /// output order. The result covers every [`ToolClass`]; tools without a
    /// surviving detection are `Missing`.
    async fn classify(&self, frame: &Frame, detections: &[Detection]) -> VisionResult<StatusMap>;
}

/// Corner-sampling placement classifier over a color-range mask.
///
/// A cheap proxy for "fully within the designated zone": both bounding-box
/// corners inside the cloth mask means in place, anything else seen means out
/// of place. Avoids polygon overlap math at frame rate.
#[derive(Debug, Clone)]
pub struct MaskPlacement {
    range: HsvRange,
    confidence_threshold: f32,
}

impl MaskPlacement {
    /// Create a classifier with a mask color range and detection threshold.
    pub fn new(range: HsvRange, confidence_threshold: f32) -> Self {
        Self {
            range,
            confidence_threshold,
        }
    }

    /// Keep one detection per class: the first seen above the threshold.
    fn dedupe<'a>(&self, detections: &'a [Detection]) -> BTreeMap<ToolClass, &'a Detection> {
        let mut kept: BTreeMap<ToolClass, &Detection> = BTreeMap::new();
        for detection in detections {
            if detection.confidence >= self.confidence_threshold {
                kept.entry(detection.tool).or_insert(detection);
            }
        }
        kept
    }
}

impl Default for MaskPlacement {
    fn default() -> Self {
        Self::new(HsvRange::default(), 0.4)
    }
}

#[async_trait]
impl PlacementStrategy for MaskPlacement {
    async fn classify(&self, frame: &Frame, detections: &[Detection]) -> VisionResult<StatusMap> {
        let mask = PlacementMask::build(frame.image(), &self.range);
        let kept = self.dedupe(detections);

        let mut statuses = StatusMap::new();
        for &tool in ToolClass::ALL {
            let status = match kept.get(&tool) {
                Some(detection) => {
                    let bbox = detection.bbox.clamped(frame.width(), frame.height());
                    let corners_inside = mask.contains(bbox.x1 as u32, bbox.y1 as u32)
                        && mask.contains(bbox.x2 as u32, bbox.y2 as u32);
                    if corners_inside {
                        PlacementStatus::InPlace
                    } else {
                        PlacementStatus::OutOfPlace
                    }
                }
                None => PlacementStatus::Missing,
            };
            debug!(tool = %tool, status = %status, frame = frame.index, "Placement");
            statuses.insert(tool, status);
        }

        Ok(statuses)
    }
}

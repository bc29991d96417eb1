//! Object detector interface.

use async_trait::async_trait;
use optrack_models::Detection;
use std::sync::Mutex;

use crate::error::VisionResult;
use crate::frame::Frame;

/// A per-frame object detector.
///
/// Treated as a black box: given a frame and a confidence threshold it
/// returns zero or more detections. Implementations must be deterministic
/// for identical input and threshold so the consensus and placement logic
/// can be tested against a stub with this exact shape. A failed detection is
/// the caller's concern (the frame enters the window with zero detections);
/// detectors are never retried.
#[async_trait]
pub trait Detector: Send + Sync {
    /// Detector identifier for logs.
    fn name(&self) -> &'static str;

    /// Run detection on one frame.
    async fn detect(&self, frame: &Frame, confidence_threshold: f32)
        -> VisionResult<Vec<Detection>>;
}

/// Scripted detector for tests and demo mode.
///
/// Replays a fixed list of per-frame detection sets in order, then returns
/// empty frames. Deterministic by construction.
pub struct StubDetector {
    script: Mutex<std::vec::IntoIter<Vec<Detection>>>,
}

impl StubDetector {
    /// Create a stub replaying `script` one entry per `detect` call.
    pub fn new(script: Vec<Vec<Detection>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter()),
        }
    }

    /// A stub that never detects anything.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl Detector for StubDetector {
    fn name(&self) -> &'static str {
        "stub"
    }

    async fn detect(
        &self,
        _frame: &Frame,
        confidence_threshold: f32,
    ) -> VisionResult<Vec<Detection>> {
        let next = self
            .script
            .lock()
            .expect("stub detector script lock")
            .next()
            .unwrap_or_default();
        Ok(next
            .into_iter()
            .filter(|d| d.confidence >= confidence_threshold)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{det, solid_frame};
    use optrack_models::ToolClass;

    #[tokio::test]
    async fn test_stub_replays_script_in_order() {
        let stub = StubDetector::new(vec![
            vec![det(ToolClass::Forceps, 0.9)],
            vec![],
            vec![det(ToolClass::Gauze, 0.8)],
        ]);
        let frame = solid_frame(0, 8, 8, [0, 0, 0]);

        let first = stub.detect(&frame, 0.4).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].tool, ToolClass::Forceps);

        assert!(stub.detect(&frame, 0.4).await.unwrap().is_empty());
        assert_eq!(stub.detect(&frame, 0.4).await.unwrap()[0].tool, ToolClass::Gauze);
        // Script exhausted: empty frames from here on.
        assert!(stub.detect(&frame, 0.4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stub_applies_confidence_threshold() {
        let stub = StubDetector::new(vec![vec![
            det(ToolClass::Forceps, 0.9),
            det(ToolClass::Gauze, 0.2),
        ]]);
        let frame = solid_frame(0, 8, 8, [0, 0, 0]);
        let detections = stub.detect(&frame, 0.4).await.unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].tool, ToolClass::Forceps);
    }
}

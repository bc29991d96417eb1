//! Windowed detection consensus and placement classification.
//!
//! This crate turns a noisy, high-rate stream of per-frame detections into a
//! low-rate, stabilized per-tool report:
//! - `DetectionBuffer` accumulates frame results for the current window
//! - `select_representative` collapses a window into the reliably-present
//!   classes and one representative frame (majority-of-frames voting)
//! - `PlacementStrategy` classifies each tool as in place / out of place /
//!   missing, either via mask corner sampling or a semantic backend
//! - `ToolTracker` carries the last-confirmed artifact reference per tool
//!   across windows

pub mod consensus;
pub mod detector;
pub mod error;
pub mod frame;
pub mod mask;
pub mod placement;
pub mod tracker;
pub mod window;

pub use consensus::{select_representative, WindowSelection, VOTE_CONFIDENCE};
pub use detector::{Detector, StubDetector};
pub use error::{VisionError, VisionResult};
pub use frame::{Frame, FrameResult};
pub use mask::{HsvRange, PlacementMask};
pub use placement::{MaskPlacement, PlacementStrategy, StatusMap};
pub use tracker::ToolTracker;
pub use window::DetectionBuffer;

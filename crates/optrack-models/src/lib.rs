//! Shared data models for the OpTrack backend.
//!
//! This crate provides Serde-serializable types for:
//! - Tracked tool classes and placement statuses
//! - Raw detector output (bounding boxes, confidences)
//! - Per-tool reports pushed to subscribers
//! - WebSocket message schemas

pub mod detection;
pub mod report;
pub mod tool;
pub mod ws;

// Re-export common types
pub use detection::{BoundingBox, Detection};
pub use report::{ToolReport, ToolReportEntry};
pub use tool::{PlacementStatus, PlacementStatusParseError, ToolClass, ToolClassParseError};
pub use ws::StreamMessage;

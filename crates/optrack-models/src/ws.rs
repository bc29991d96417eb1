//! WebSocket message types.
//!
//! Subscribers receive two message kinds on one socket: the annotated frame
//! relay (high rate) and the per-tool status report (once per tick).

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::report::ToolReport;

/// WebSocket message envelope.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// One processed video frame, JPEG-encoded and base64-wrapped.
    Frame {
        /// Base64 JPEG payload
        data: String,
    },

    /// Per-tool placement report for the tick that just closed.
    Report {
        tools: ToolReport,
        timestamp: DateTime<Utc>,
    },

    /// Non-fatal pipeline error surfaced to subscribers.
    Error {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl StreamMessage {
    /// Create a frame message from base64 JPEG data.
    pub fn frame(data: impl Into<String>) -> Self {
        StreamMessage::Frame { data: data.into() }
    }

    /// Create a report message stamped with the current time.
    pub fn report(tools: ToolReport) -> Self {
        StreamMessage::Report {
            tools,
            timestamp: Utc::now(),
        }
    }

    /// Create an error message.
    pub fn error(message: impl Into<String>) -> Self {
        StreamMessage::Error {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

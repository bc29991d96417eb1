//! Per-tool status reports.
//!
//! A report covers every tracked tool class exactly once, in
//! [`ToolClass::ALL`] order, and serializes as a plain JSON array of
//! `{tool, status, last_seen}` objects — the shape subscribers consume.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::tool::{PlacementStatus, ToolClass};

/// One row of a report: a tool, its placement status for the current tick,
/// and a reference to the artifact in which it was last confirmed present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ToolReportEntry {
    pub tool: ToolClass,
    pub status: PlacementStatus,
    /// Artifact reference (object URL) of the last confirmed sighting.
    /// Empty until the tool has been confirmed present at least once.
    pub last_seen: String,
}

/// Full report for all tracked tool classes.
///
/// Serializes transparently as a JSON array; entry order is fixed by
/// `ToolClass::ALL`, never by window contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ToolReport {
    pub entries: Vec<ToolReportEntry>,
}

impl ToolReport {
    /// Create a report from entries.
    ///
    /// Callers are expected to supply one entry per class in `ALL` order;
    /// the tracker is the only producer.
    pub fn new(entries: Vec<ToolReportEntry>) -> Self {
        Self { entries }
    }

    /// Look up the entry for a tool.
    pub fn entry(&self, tool: ToolClass) -> Option<&ToolReportEntry> {
        self.entries.iter().find(|e| e.tool == tool)
    }

    /// Status of a tool, `Missing` if absent (reports normally cover all).
    pub fn status(&self, tool: ToolClass) -> PlacementStatus {
        self.entry(tool)
            .map(|e| e.status)
            .unwrap_or(PlacementStatus::Missing)
    }
}

impl IntoIterator for ToolReport {
    type Item = ToolReportEntry;
    type IntoIter = std::vec::IntoIter<ToolReportEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> ToolReport {
        ToolReport::new(vec![
            ToolReportEntry {
                tool: ToolClass::Forceps,
                status: PlacementStatus::InPlace,
                last_seen: "https://clips.example.com/session/clip-3.mp4".to_string(),
            },
            ToolReportEntry {
                tool: ToolClass::Gauze,
                status: PlacementStatus::Missing,
                last_seen: String::new(),
            },
            ToolReportEntry {
                tool: ToolClass::Scissors,
                status: PlacementStatus::OutOfPlace,
                last_seen: "https://clips.example.com/session/clip-2.mp4".to_string(),
            },
        ])
    }

    #[test]
    fn test_report_serializes_as_array() {
        let json = serde_json::to_string(&sample_report()).unwrap();
        assert!(json.starts_with('['));
        assert!(json.contains("\"tool\":\"forceps\""));
        assert!(json.contains("\"status\":\"out_of_place\""));
    }

    #[test]
    fn test_report_round_trip() {
        let report = sample_report();
        let json = serde_json::to_string(&report).unwrap();
        let parsed: ToolReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
        // Order is preserved through the round trip.
        let tools: Vec<_> = parsed.entries.iter().map(|e| e.tool).collect();
        assert_eq!(tools, ToolClass::ALL.to_vec());
    }

    #[test]
    fn test_report_lookup() {
        let report = sample_report();
        assert_eq!(report.status(ToolClass::Gauze), PlacementStatus::Missing);
        assert_eq!(
            report.entry(ToolClass::Scissors).unwrap().last_seen,
            "https://clips.example.com/session/clip-2.mp4"
        );
    }
}

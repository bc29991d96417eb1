//! Process-wide tool state: last confirmed sighting per tool.

use std::collections::BTreeMap;

use optrack_models::{PlacementStatus, ToolClass, ToolReport, ToolReportEntry};
use tracing::debug;

use crate::placement::StatusMap;

/// Tracks, per tool class, the artifact reference of the last tick in which
/// the tool was confirmed present.
///
/// Lives for the whole session; windows come and go, this does not reset.
/// `last_seen` only ever moves forward to a newer reference — it reflects the
/// most recent known-good sighting, not current visibility.
#[derive(Debug, Clone)]
pub struct ToolTracker {
    last_seen: BTreeMap<ToolClass, String>,
}

impl ToolTracker {
    /// Create a tracker with every known tool mapped to an empty reference.
    pub fn new() -> Self {
        let last_seen = ToolClass::ALL
            .iter()
            .map(|&tool| (tool, String::new()))
            .collect();
        Self { last_seen }
    }

    /// Merge a tick's placement statuses against an artifact reference.
    ///
    /// Tools confirmed present (not `missing`) take `artifact_ref` as their
    /// new `last_seen`; missing tools keep their previous reference. An empty
    /// `artifact_ref` never overwrites anything — a populated reference is
    /// never cleared. Returns the full report in fixed class order.
    pub fn merge(&mut self, statuses: &StatusMap, artifact_ref: &str) -> ToolReport {
        let entries = ToolClass::ALL
            .iter()
            .map(|&tool| {
                let status = statuses
                    .get(&tool)
                    .copied()
                    .unwrap_or(PlacementStatus::Missing);

                if status.is_present() && !artifact_ref.is_empty() {
                    debug!(tool = %tool, artifact = artifact_ref, "Updating last seen");
                    self.last_seen.insert(tool, artifact_ref.to_string());
                }

                ToolReportEntry {
                    tool,
                    status,
                    last_seen: self.last_seen[&tool].clone(),
                }
            })
            .collect();

        ToolReport::new(entries)
    }

    /// Report with every tool missing against its current `last_seen`.
    ///
    /// Used when a tick closes over an empty window.
    pub fn report_all_missing(&mut self) -> ToolReport {
        self.merge(&StatusMap::new(), "")
    }

    /// Current `last_seen` reference for a tool.
    pub fn last_seen(&self, tool: ToolClass) -> &str {
        &self.last_seen[&tool]
    }
}

impl Default for ToolTracker {
    fn default() -> Self {
        Self::new()
    }
}

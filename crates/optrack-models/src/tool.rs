//! Tracked tool classes and placement statuses.
//!
//! The set of tool classes is closed and known ahead of time; it matches the
//! classes the detection model was trained on. Reports always cover every
//! class, in `ToolClass::ALL` order, so subscribers see a stable schema.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A tracked surgical tool class.
///
/// Closed enumeration: the variant set never changes at runtime. Detector
/// class ids map onto this enum via [`ToolClass::from_class_id`]; ids outside
/// the known range are dropped at the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ToolClass {
    Forceps,
    Gauze,
    Scissors,
}

impl ToolClass {
    /// All tracked classes, in report order.
    pub const ALL: &'static [ToolClass] = &[ToolClass::Forceps, ToolClass::Gauze, ToolClass::Scissors];

    /// Map a raw detector class id to a tool class.
    ///
    /// Returns `None` for ids the model does not label; callers drop the
    /// single detection rather than failing the frame.
    pub fn from_class_id(id: usize) -> Option<Self> {
        match id {
            0 => Some(ToolClass::Forceps),
            1 => Some(ToolClass::Gauze),
            2 => Some(ToolClass::Scissors),
            _ => None,
        }
    }

    /// The detector class id for this tool.
    pub fn class_id(&self) -> usize {
        match self {
            ToolClass::Forceps => 0,
            ToolClass::Gauze => 1,
            ToolClass::Scissors => 2,
        }
    }

    /// Returns the class name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolClass::Forceps => "forceps",
            ToolClass::Gauze => "gauze",
            ToolClass::Scissors => "scissors",
        }
    }
}

impl fmt::Display for ToolClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolClass {
    type Err = ToolClassParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forceps" => Ok(ToolClass::Forceps),
            "gauze" => Ok(ToolClass::Gauze),
            "scissors" => Ok(ToolClass::Scissors),
            _ => Err(ToolClassParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown tool class: {0}")]
pub struct ToolClassParseError(String);

/// Placement status of one tool relative to the designated zone.
///
/// Exactly one value per tool per report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStatus {
    /// The tool sits fully within the designated zone.
    InPlace,
    /// The tool was seen, but outside (or partially outside) the zone.
    OutOfPlace,
    /// The tool was not reliably present in the window.
    Missing,
}

impl PlacementStatus {
    /// Returns the status as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlacementStatus::InPlace => "in_place",
            PlacementStatus::OutOfPlace => "out_of_place",
            PlacementStatus::Missing => "missing",
        }
    }

    /// Whether the tool was confirmed present this tick.
    pub fn is_present(&self) -> bool {
        !matches!(self, PlacementStatus::Missing)
    }
}

impl fmt::Display for PlacementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PlacementStatus {
    type Err = PlacementStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Vision-language backends answer in prose ("in place"), the wire
        // format uses snake_case; accept both.
        match s.trim().to_lowercase().replace(' ', "_").as_str() {
            "in_place" => Ok(PlacementStatus::InPlace),
            "out_of_place" => Ok(PlacementStatus::OutOfPlace),
            "missing" => Ok(PlacementStatus::Missing),
            _ => Err(PlacementStatusParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown placement status: {0}")]
pub struct PlacementStatusParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_id_round_trip() {
        for &tool in ToolClass::ALL {
            assert_eq!(ToolClass::from_class_id(tool.class_id()), Some(tool));
        }
        assert_eq!(ToolClass::from_class_id(3), None);
        assert_eq!(ToolClass::from_class_id(99), None);
    }

    #[test]
    fn test_tool_parse() {
        assert_eq!("forceps".parse::<ToolClass>().unwrap(), ToolClass::Forceps);
        assert_eq!("Gauze".parse::<ToolClass>().unwrap(), ToolClass::Gauze);
        assert!("scalpel".parse::<ToolClass>().is_err());
    }

    #[test]
    fn test_status_parse_accepts_prose() {
        assert_eq!("in place".parse::<PlacementStatus>().unwrap(), PlacementStatus::InPlace);
        assert_eq!("out of place".parse::<PlacementStatus>().unwrap(), PlacementStatus::OutOfPlace);
        assert_eq!("missing".parse::<PlacementStatus>().unwrap(), PlacementStatus::Missing);
        assert!("lost".parse::<PlacementStatus>().is_err());
    }

    #[test]
    fn test_serde_snake_case() {
        assert_eq!(serde_json::to_string(&ToolClass::Scissors).unwrap(), "\"scissors\"");
        assert_eq!(
            serde_json::to_string(&PlacementStatus::OutOfPlace).unwrap(),
            "\"out_of_place\""
        );
    }
}

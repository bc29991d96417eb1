//! Window consensus: majority voting and representative frame selection.
//!
//! A window of N frames votes per class: a class is *required* when it was
//! detected (above [`VOTE_CONFIDENCE`]) in a strict majority of frames. The
//! representative frame is the candidate — a frame that captures every
//! required class — with the highest summed required-class confidence; exact
//! ties go to the earliest frame. Sparse or flickering detections never reach
//! a majority, which is the pipeline's noise rejection.

use std::collections::{BTreeMap, BTreeSet};

use optrack_models::ToolClass;
use tracing::debug;

use crate::frame::FrameResult;

/// Confidence a detection must exceed to count as a vote.
///
/// Independent of the detector's own inference threshold; voting is stricter.
pub const VOTE_CONFIDENCE: f32 = 0.5;

/// Outcome of collapsing one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSelection {
    /// Position of the representative frame within the window.
    pub frame_index: usize,
    /// Classes judged reliably present, in fixed class order.
    pub required: Vec<ToolClass>,
}

/// Collapse a window of frame results into the required classes and a
/// representative frame.
///
/// Returns `None` for an empty window, for a window whose vote produces no
/// required class, and for a window where no frame captures every required
/// class at once — all valid empty outcomes, not errors.
pub fn select_representative(frames: &[FrameResult]) -> Option<WindowSelection> {
    let total = frames.len();
    if total == 0 {
        return None;
    }

    // Step 1: per class, count distinct frames with an above-threshold
    // detection (at most one vote per class per frame).
    let mut votes: BTreeMap<ToolClass, usize> = BTreeMap::new();
    for result in frames {
        let mut seen: BTreeSet<ToolClass> = BTreeSet::new();
        for detection in &result.detections {
            if detection.confidence > VOTE_CONFIDENCE && seen.insert(detection.tool) {
                *votes.entry(detection.tool).or_insert(0) += 1;
            }
        }
    }

    // Step 2: strict majority of frames. At exactly N/2 (even N) a class is
    // not required.
    let required: BTreeSet<ToolClass> = votes
        .iter()
        .filter(|(_, &count)| count * 2 > total)
        .map(|(&tool, _)| tool)
        .collect();

    // Step 3: among frames capturing every required class, pick the one with
    // the strictly highest summed required-class confidence. The strict `>`
    // scan makes the earliest frame win exact ties, and rejects everything
    // when the required set is empty (no sum can exceed zero).
    let mut best_index = None;
    let mut best_score = 0.0f32;

    for (i, result) in frames.iter().enumerate() {
        let mut detected: BTreeSet<ToolClass> = BTreeSet::new();
        let mut score = 0.0f32;
        for detection in &result.detections {
            if required.contains(&detection.tool) && detection.confidence > VOTE_CONFIDENCE {
                detected.insert(detection.tool);
                score += detection.confidence;
            }
        }

        if required.is_subset(&detected) && score > best_score {
            best_score = score;
            best_index = Some(i);
        }
    }

    let frame_index = best_index?;
    debug!(
        window_len = total,
        frame_index,
        score = best_score,
        required = ?required,
        "Selected representative frame"
    );

    Some(WindowSelection {
        frame_index,
        required: required.into_iter().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::test_support::{det, solid_frame};
    use crate::frame::FrameResult;
    use optrack_models::{Detection, ToolClass};

    fn window(detections_per_frame: Vec<Vec<Detection>>) -> Vec<FrameResult> {
        detections_per_frame
            .into_iter()
            .enumerate()
            .map(|(i, dets)| FrameResult::new(solid_frame(i as u64, 8, 8, [0, 0, 0]), dets))
            .collect()
    }

    #[test]
    fn test_empty_window() {
        assert_eq!(select_representative(&[]), None);
    }

    #[test]
    fn test_strict_majority_required() {
        // A in 3 of 5 frames (conf 0.6), B in only 2 (conf 0.55).
        let frames = window(vec![
            vec![det(ToolClass::Forceps, 0.6), det(ToolClass::Gauze, 0.55)],
            vec![det(ToolClass::Forceps, 0.6)],
            vec![det(ToolClass::Gauze, 0.55)],
            vec![det(ToolClass::Forceps, 0.6)],
            vec![],
        ]);
        let selection = select_representative(&frames).unwrap();
        assert_eq!(selection.required, vec![ToolClass::Forceps]);
    }

    #[test]
    fn test_exactly_half_is_not_required() {
        // 2 of 4 frames is not a strict majority.
        let frames = window(vec![
            vec![det(ToolClass::Scissors, 0.9)],
            vec![det(ToolClass::Scissors, 0.9)],
            vec![],
            vec![],
        ]);
        assert_eq!(select_representative(&frames), None);
    }

    #[test]
    fn test_low_confidence_detections_do_not_vote() {
        // Present in every frame but never above the vote threshold.
        let frames = window(vec![
            vec![det(ToolClass::Gauze, 0.5)],
            vec![det(ToolClass::Gauze, 0.45)],
            vec![det(ToolClass::Gauze, 0.49)],
        ]);
        assert_eq!(select_representative(&frames), None);
    }

    #[test]
    fn test_single_outlier_frame_is_suppressed() {
        let frames = window(vec![
            vec![],
            vec![det(ToolClass::Scissors, 0.99)],
            vec![],
            vec![],
            vec![],
        ]);
        assert_eq!(select_representative(&frames), None);
    }

    #[test]
    fn test_duplicate_detections_vote_once_per_frame() {
        // Two boxes for the same class in one frame count as one vote.
        let frames = window(vec![
            vec![det(ToolClass::Forceps, 0.8), det(ToolClass::Forceps, 0.7)],
            vec![],
            vec![],
        ]);
        assert_eq!(select_representative(&frames), None);
    }

    #[test]
    fn test_highest_summed_confidence_wins() {
        let frames = window(vec![
            vec![det(ToolClass::Forceps, 0.6)],
            vec![det(ToolClass::Forceps, 0.6), det(ToolClass::Forceps, 0.55)],
            vec![det(ToolClass::Forceps, 0.7)],
        ]);
        // Frame 1 sums 1.15, beating frame 2's 0.7.
        let selection = select_representative(&frames).unwrap();
        assert_eq!(selection.frame_index, 1);
    }

    #[test]
    fn test_earliest_frame_wins_exact_tie() {
        let frames = window(vec![
            vec![det(ToolClass::Forceps, 0.8)],
            vec![det(ToolClass::Forceps, 0.8)],
            vec![det(ToolClass::Forceps, 0.8)],
        ]);
        let selection = select_representative(&frames).unwrap();
        assert_eq!(selection.frame_index, 0);
    }

    #[test]
    fn test_candidate_must_capture_all_required_classes() {
        // Both classes required; only frame 2 has both, despite frame 0's
        // stronger forceps detection.
        let frames = window(vec![
            vec![det(ToolClass::Forceps, 0.95), det(ToolClass::Gauze, 0.9)],
            vec![det(ToolClass::Forceps, 0.9), det(ToolClass::Gauze, 0.9)],
            vec![det(ToolClass::Forceps, 0.9)],
        ]);
        let selection = select_representative(&frames).unwrap();
        assert_eq!(selection.required, vec![ToolClass::Forceps, ToolClass::Gauze]);
        assert_eq!(selection.frame_index, 0);

        let frames = window(vec![
            vec![det(ToolClass::Forceps, 0.95)],
            vec![det(ToolClass::Forceps, 0.6), det(ToolClass::Gauze, 0.9)],
            vec![det(ToolClass::Forceps, 0.6), det(ToolClass::Gauze, 0.9)],
        ]);
        let selection = select_representative(&frames).unwrap();
        // Frame 0 misses gauze, so it cannot represent the window.
        assert_eq!(selection.frame_index, 1);
    }

    #[test]
    fn test_required_without_candidate_yields_none() {
        // All three classes reach a majority, but no single frame captures
        // all of them at once.
        let frames = window(vec![
            vec![det(ToolClass::Forceps, 0.9), det(ToolClass::Gauze, 0.9)],
            vec![det(ToolClass::Gauze, 0.9), det(ToolClass::Scissors, 0.9)],
            vec![det(ToolClass::Scissors, 0.9), det(ToolClass::Forceps, 0.9)],
        ]);
        assert_eq!(select_representative(&frames), None);
    }
}

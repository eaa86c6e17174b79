//! Exit-Eligibility Gate: decides whether a journey may graduate now.
//!
//! Precedence, first match wins:
//! 1. completed ≥ max_sprints                      → suggest_exit (forced)
//! 2. readiness ≥ threshold and completed ≥ min     → ready
//! 3. otherwise                                     → continue

use serde::{Deserialize, Serialize};

use crate::progression::policy::ProgressionPath;
use crate::progression::readiness::truncate1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitRecommendation {
    Continue,
    Ready,
    SuggestExit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExitEligibility {
    pub can_exit: bool,
    pub min_sprints_met: bool,
    pub readiness_threshold_met: bool,
    pub max_sprints_reached: bool,
    pub user_can_choose: bool,
    pub recommendation: ExitRecommendation,
    pub message: String,
    pub completed_sprints: u32,
    pub readiness: f64,
}

/// `readiness` must be the untruncated average; the reported value is
/// truncated for display after the comparison.
pub fn evaluate_exit(
    completed_sprints: u32,
    readiness: f64,
    path: Option<&ProgressionPath>,
) -> ExitEligibility {
    let shown = truncate1(readiness);
    let Some(path) = path else {
        return ExitEligibility {
            can_exit: false,
            min_sprints_met: false,
            readiness_threshold_met: false,
            max_sprints_reached: false,
            user_can_choose: false,
            recommendation: ExitRecommendation::Continue,
            message: "No progression path is configured for this journey yet. Keep going!"
                .to_string(),
            completed_sprints,
            readiness: shown,
        };
    };

    let min_sprints_met = completed_sprints >= path.min_sprints;
    let readiness_threshold_met = readiness >= path.readiness_threshold;
    let max_sprints_reached = completed_sprints >= path.max_sprints;

    let (recommendation, can_exit, user_can_choose, message) = if max_sprints_reached {
        (
            ExitRecommendation::SuggestExit,
            true,
            false,
            format!(
                "You have completed the maximum of {} sprints. Time to wrap up this journey.",
                path.max_sprints
            ),
        )
    } else if readiness_threshold_met && min_sprints_met {
        (
            ExitRecommendation::Ready,
            true,
            true,
            format!(
                "Readiness {shown:.1}% meets the {:.0}% bar after {completed_sprints} sprints. You can graduate or keep sharpening your skills.",
                path.readiness_threshold
            ),
        )
    } else if !min_sprints_met {
        let remaining = path.min_sprints - completed_sprints;
        (
            ExitRecommendation::Continue,
            false,
            false,
            format!(
                "Complete {remaining} more sprint{} before graduation opens up.",
                if remaining == 1 { "" } else { "s" }
            ),
        )
    } else {
        (
            ExitRecommendation::Continue,
            false,
            false,
            format!(
                "Readiness {shown:.1}% is below the {:.0}% bar. Keep building evidence.",
                path.readiness_threshold
            ),
        )
    };

    ExitEligibility {
        can_exit,
        min_sprints_met,
        readiness_threshold_met,
        max_sprints_reached,
        user_can_choose,
        recommendation,
        message,
        completed_sprints,
        readiness: shown,
    }
}

//! Per-skill match heuristic shared by the greedy allocator and the
//! relevance scorer.
//!
//! Scoring: exact skill-tag match → 1.0, bullet-text substring hit → 0.6,
//! plus a 0.2 metric bonus when the bullet quantifies its impact and the base
//! score is positive. A score at or above [`STRONG_MATCH`] means the skill is
//! considered covered.

use crate::models::content::ContentUnit;
use crate::scoring::style::has_quantified_impact;

/// Threshold above which a selected unit fully covers a target skill.
pub const STRONG_MATCH: f64 = 1.0;

const TAG_MATCH: f64 = 1.0;
const TEXT_MATCH: f64 = 0.6;
const METRIC_BONUS: f64 = 0.2;

/// How well a single content unit matches one target skill.
pub fn match_score(unit: &ContentUnit, skill: &str) -> f64 {
    let skill_lower = skill.to_lowercase();

    let tag_hit = unit
        .skills
        .iter()
        .any(|tag| tag.to_lowercase() == skill_lower);
    let base = if tag_hit {
        TAG_MATCH
    } else if unit.text.to_lowercase().contains(&skill_lower) {
        TEXT_MATCH
    } else {
        0.0
    };

    if base > 0.0 && has_quantified_impact(&unit.text) {
        base + METRIC_BONUS
    } else {
        base
    }
}

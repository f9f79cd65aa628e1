//! Core content model — stories, bullets, skill targets, and rewrite results.
//!
//! `ContentUnit` and `Story` are materialized once per run from the experience
//! pool and never mutated afterward. `RewrittenBullet` collections are cloned
//! before each repair iteration so earlier iterations stay inspectable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One candidate line of resume content, tagged with skills and a character
/// length. Immutable once materialized from the experience pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentUnit {
    pub id: String,
    pub story_id: String,
    pub text: String,
    pub skills: Vec<String>,
    pub char_len: usize,
    /// Derived at materialization: `ceil(char_len / chars_per_line)`, min 1.
    pub estimated_lines: u32,
}

impl ContentUnit {
    pub fn new(
        id: impl Into<String>,
        story_id: impl Into<String>,
        text: impl Into<String>,
        skills: Vec<String>,
        chars_per_line: usize,
    ) -> Self {
        let text = text.into();
        let char_len = text.chars().count();
        Self {
            id: id.into(),
            story_id: story_id.into(),
            estimated_lines: estimate_lines(char_len, chars_per_line),
            text,
            skills,
            char_len,
        }
    }
}

/// Line estimate for a bullet of `char_len` characters. Never 0 — even an
/// empty bullet occupies one printed line.
pub fn estimate_lines(char_len: usize, chars_per_line: usize) -> u32 {
    let per_line = chars_per_line.max(1);
    (char_len.div_ceil(per_line)).max(1) as u32
}

/// A group of content units representing one role or project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: String,
    pub role: String,
    pub company: String,
    pub bullets: Vec<ContentUnit>,
    /// Opaque pool metadata passed through to the renderer (dates, location).
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// A story as ranked by the external relevance ranker, best first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedStory {
    pub story_id: String,
    /// Externally supplied relevance in `[0, 1]`.
    pub relevance: f64,
}

/// Builds a `story_id → relevance` lookup from a ranked list.
pub fn relevance_by_story(ranked: &[RankedStory]) -> HashMap<String, f64> {
    ranked
        .iter()
        .map(|r| (r.story_id.clone(), r.relevance))
        .collect()
}

/// A target skill from the job profile, weighted by importance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillTarget {
    pub name: String,
    pub weight: f64,
    /// Where the weight came from (e.g. "jd_keyword", "hard_requirement").
    pub source: String,
}

/// Caps on total selected bullets and estimated lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceBudget {
    pub max_bullets: u32,
    pub max_lines: u32,
}

/// Outcome of the four boolean style checks on a rewritten bullet.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StyleFlags {
    pub strong_verb: bool,
    pub quantified_impact: bool,
    pub taboo_free: bool,
    pub within_length: bool,
}

impl StyleFlags {
    /// Fraction of the four checks that pass, in `[0, 1]`.
    pub fn quality(&self) -> f64 {
        let passed = [
            self.strong_verb,
            self.quantified_impact,
            self.taboo_free,
            self.within_length,
        ]
        .iter()
        .filter(|f| **f)
        .count();
        passed as f64 / 4.0
    }
}

/// A content unit after external text regeneration. Keyed by the original
/// unit id; one-to-one with a selected id in the current plan, though the two
/// sets may diverge temporarily mid-repair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewrittenBullet {
    pub unit_id: String,
    pub text: String,
    pub char_len: usize,
    pub estimated_lines: u32,
    pub style: StyleFlags,
    /// Shorten intent recorded by the repair apply step; consumed by the next
    /// selective rewrite call.
    #[serde(default)]
    pub target_chars: Option<usize>,
}

/// The current rewritten text for every selected unit, keyed by unit id.
pub type RewrittenSet = HashMap<String, RewrittenBullet>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_estimate_lines_rounds_up() {
        assert_eq!(estimate_lines(0, 90), 1);
        assert_eq!(estimate_lines(90, 90), 1);
        assert_eq!(estimate_lines(91, 90), 2);
        assert_eq!(estimate_lines(180, 90), 2);
    }

    #[test]
    fn test_content_unit_derives_length_and_lines() {
        let unit = ContentUnit::new("b1", "s1", "x".repeat(100), vec![], 90);
        assert_eq!(unit.char_len, 100);
        assert_eq!(unit.estimated_lines, 2);
    }

    #[test]
    fn test_style_quality_fraction() {
        let flags = StyleFlags {
            strong_verb: true,
            quantified_impact: true,
            taboo_free: false,
            within_length: false,
        };
        assert!((flags.quality() - 0.5).abs() < f64::EPSILON);
        assert_eq!(StyleFlags::default().quality(), 0.0);
    }

    #[test]
    fn test_relevance_lookup() {
        let ranked = vec![
            RankedStory {
                story_id: "s1".into(),
                relevance: 0.9,
            },
            RankedStory {
                story_id: "s2".into(),
                relevance: 0.4,
            },
        ];
        let map = relevance_by_story(&ranked);
        assert_eq!(map.get("s1"), Some(&0.9));
        assert_eq!(map.get("s3"), None);
    }
}

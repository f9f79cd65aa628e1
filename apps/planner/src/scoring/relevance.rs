//! Multi-factor relevance scoring for units already placed in a plan.
//!
//! `score = 0.40·story_relevance + 0.30·skill_coverage
//!        + 0.20·length_efficiency + 0.10·style_quality`
//!
//! `score_all` returns ascending order, so the front of the list is the best
//! drop-candidate set. Pure function of its inputs.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::EngineError;
use crate::models::content::{ContentUnit, RewrittenSet, Story};
use crate::models::plan::Plan;
use crate::scoring::style::compute_style_flags;

const W_STORY_RELEVANCE: f64 = 0.40;
const W_SKILL_COVERAGE: f64 = 0.30;
const W_LENGTH_EFFICIENCY: f64 = 0.20;
const W_STYLE_QUALITY: f64 = 0.10;

/// Relevance of a story the ranker never scored.
const UNKNOWN_STORY_RELEVANCE: f64 = 0.5;

/// A selected unit with its weighted drop/keep score. Transient — recomputed
/// per planning or repair pass, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredBullet {
    pub unit_id: String,
    pub story_id: String,
    pub score: f64,
    pub story_relevance: f64,
    pub skill_coverage: f64,
    pub length_efficiency: f64,
    pub style_quality: f64,
}

/// Scores every unit selected in `plan`, ascending by score.
///
/// Length and style come from the current rewritten text when present,
/// falling back to the pool text otherwise. A selected id missing from the
/// pool is a reference error — the plan points at content that does not
/// exist, which is never safe to paper over here.
pub fn score_all(
    plan: &Plan,
    pool: &[Story],
    story_relevance: &HashMap<String, f64>,
    rewritten: &RewrittenSet,
    target_max_chars: usize,
    banned_phrases: &[String],
) -> Result<Vec<ScoredBullet>, EngineError> {
    let units: HashMap<&str, &ContentUnit> = pool
        .iter()
        .flat_map(|s| s.bullets.iter())
        .map(|b| (b.id.as_str(), b))
        .collect();

    let mut scored = Vec::new();
    for selection in &plan.selections {
        for unit_id in &selection.bullet_ids {
            let unit = units
                .get(unit_id.as_str())
                .ok_or_else(|| EngineError::reference("content unit", unit_id.clone()))?;

            let relevance = story_relevance
                .get(&selection.story_id)
                .copied()
                .unwrap_or(UNKNOWN_STORY_RELEVANCE);

            let skill_coverage = (unit.skills.len().min(5)) as f64 / 5.0;

            let (char_len, style_quality) = match rewritten.get(unit_id) {
                Some(rw) => (rw.char_len, rw.style.quality()),
                None => (
                    unit.char_len,
                    compute_style_flags(&unit.text, target_max_chars, banned_phrases).quality(),
                ),
            };
            let length_efficiency = length_efficiency(char_len, target_max_chars);

            scored.push(ScoredBullet {
                unit_id: unit_id.clone(),
                story_id: selection.story_id.clone(),
                score: W_STORY_RELEVANCE * relevance
                    + W_SKILL_COVERAGE * skill_coverage
                    + W_LENGTH_EFFICIENCY * length_efficiency
                    + W_STYLE_QUALITY * style_quality,
                story_relevance: relevance,
                skill_coverage,
                length_efficiency,
                style_quality,
            });
        }
    }

    // Ascending: front of the list is the best drop candidate. Stable sort
    // keeps encounter order for equal scores.
    scored.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    Ok(scored)
}

/// Shorter bullets are more space-efficient: `1 - len/(2·target)`, clamped.
fn length_efficiency(char_len: usize, target_max_chars: usize) -> f64 {
    let target = target_max_chars.max(1) as f64;
    (1.0 - char_len as f64 / (2.0 * target)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::content::SpaceBudget;
    use crate::models::plan::{Coverage, StorySelection};

    fn make_story(id: &str, bullets: Vec<ContentUnit>) -> Story {
        Story {
            id: id.to_string(),
            role: "Engineer".to_string(),
            company: "Acme".to_string(),
            bullets,
            metadata: serde_json::json!({}),
        }
    }

    fn make_plan(selections: Vec<StorySelection>) -> Plan {
        Plan::new(
            selections,
            SpaceBudget {
                max_bullets: 10,
                max_lines: 20,
            },
            Coverage::default(),
            0.0,
        )
    }

    fn select(story_id: &str, ids: &[&str]) -> StorySelection {
        StorySelection {
            story_id: story_id.to_string(),
            bullet_ids: ids.iter().map(|s| s.to_string()).collect(),
            estimated_lines: ids.len() as u32,
        }
    }

    #[test]
    fn test_length_efficiency_clamped() {
        assert_eq!(length_efficiency(0, 180), 1.0);
        assert!((length_efficiency(180, 180) - 0.5).abs() < f64::EPSILON);
        assert_eq!(length_efficiency(1000, 180), 0.0);
    }

    #[test]
    fn test_score_all_ascending_order() {
        let weak = ContentUnit::new("b_weak", "s1", "Was responsible for stuff", vec![], 90);
        let strong = ContentUnit::new(
            "b_strong",
            "s1",
            "Reduced p99 latency by 40%",
            vec!["rust".into(), "profiling".into(), "observability".into()],
            90,
        );
        let pool = vec![make_story("s1", vec![weak, strong])];
        let plan = make_plan(vec![select("s1", &["b_weak", "b_strong"])]);
        let relevance = HashMap::from([("s1".to_string(), 0.9)]);

        let scored =
            score_all(&plan, &pool, &relevance, &RewrittenSet::new(), 180, &[]).unwrap();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].unit_id, "b_weak", "weakest bullet drops first");
        assert!(scored[0].score <= scored[1].score);
    }

    #[test]
    fn test_unknown_story_defaults_to_half_relevance() {
        let unit = ContentUnit::new("b1", "s_unranked", "Built the thing", vec![], 90);
        let pool = vec![make_story("s_unranked", vec![unit])];
        let plan = make_plan(vec![select("s_unranked", &["b1"])]);

        let scored =
            score_all(&plan, &pool, &HashMap::new(), &RewrittenSet::new(), 180, &[]).unwrap();
        assert!((scored[0].story_relevance - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_skill_coverage_capped_at_five() {
        let skills: Vec<String> = (0..8).map(|i| format!("skill{i}")).collect();
        let unit = ContentUnit::new("b1", "s1", "Shipped 3 services", skills, 90);
        let pool = vec![make_story("s1", vec![unit])];
        let plan = make_plan(vec![select("s1", &["b1"])]);

        let scored =
            score_all(&plan, &pool, &HashMap::new(), &RewrittenSet::new(), 180, &[]).unwrap();
        assert_eq!(scored[0].skill_coverage, 1.0);
    }

    #[test]
    fn test_unknown_unit_id_is_reference_error() {
        let pool = vec![make_story("s1", vec![])];
        let plan = make_plan(vec![select("s1", &["b_missing"])]);

        let err = score_all(&plan, &pool, &HashMap::new(), &RewrittenSet::new(), 180, &[])
            .unwrap_err();
        assert!(matches!(err, EngineError::Reference { .. }));
    }
}

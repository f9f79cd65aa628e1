//! Greedy skill-coverage allocator — the first phase of the hybrid planner.
//!
//! Walks the target skills in descending weight order and, for each skill not
//! already strongly covered, selects the single best-matching unselected unit
//! that fits the remaining budget. Ties resolve to the first candidate found
//! with the maximum score — a documented tie-break, not an accident of
//! iteration order.

use std::collections::HashSet;

use tracing::debug;

use crate::models::content::{ContentUnit, SkillTarget, Story};
use crate::scoring::skill_match::{match_score, STRONG_MATCH};

/// Outcome of the greedy phase. `selected_ids` preserves selection order; the
/// hybrid planner uses it to exclude these units from the knapsack phase.
#[derive(Debug, Clone, Default)]
pub struct GreedyResult {
    pub selected_ids: Vec<String>,
    pub used_lines: u32,
    pub used_bullets: u32,
    /// Σ (target weight × match score) over the selections made.
    pub value: f64,
}

/// Runs the greedy allocation over the flattened candidate pool.
///
/// Both caps are enforced: the line budget drives the walk (per the
/// allocator's contract) and the bullet cap keeps the final plan invariant
/// intact when the greedy phase alone would exhaust it.
pub fn run_greedy(
    stories: &[Story],
    targets: &[SkillTarget],
    line_budget: u32,
    bullet_budget: u32,
) -> GreedyResult {
    let candidates: Vec<&ContentUnit> = stories.iter().flat_map(|s| s.bullets.iter()).collect();

    let mut sorted_targets: Vec<&SkillTarget> = targets.iter().collect();
    sorted_targets.sort_by(|a, b| {
        b.weight
            .partial_cmp(&a.weight)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut result = GreedyResult::default();
    let mut used: HashSet<&str> = HashSet::new();
    let mut selected_units: Vec<&ContentUnit> = Vec::new();

    for target in sorted_targets {
        if result.used_lines >= line_budget || result.used_bullets >= bullet_budget {
            break;
        }

        // Skill already strongly covered by an earlier selection — skip.
        let covered = selected_units
            .iter()
            .any(|u| match_score(u, &target.name) >= STRONG_MATCH);
        if covered {
            debug!(skill = %target.name, "greedy: skill already covered, skipping");
            continue;
        }

        // Best unselected candidate; first candidate wins ties (strict `>`).
        let mut best: Option<(&ContentUnit, f64)> = None;
        for unit in &candidates {
            if used.contains(unit.id.as_str()) {
                continue;
            }
            let score = match_score(unit, &target.name);
            if score > best.map(|(_, s)| s).unwrap_or(0.0) {
                best = Some((unit, score));
            }
        }

        if let Some((unit, score)) = best {
            let fits = unit.estimated_lines <= line_budget - result.used_lines;
            if fits {
                used.insert(unit.id.as_str());
                selected_units.push(unit);
                result.selected_ids.push(unit.id.clone());
                result.used_lines += unit.estimated_lines;
                result.used_bullets += 1;
                result.value += target.weight * score;
                debug!(
                    skill = %target.name,
                    unit = %unit.id,
                    score,
                    "greedy: selected unit for skill"
                );
            }
        }
    }

    result
}

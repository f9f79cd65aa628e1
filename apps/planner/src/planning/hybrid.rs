//! Hybrid planner — greedy skill coverage first, knapsack on the remainder.
//!
//! The greedy phase gets `floor(max_lines × skill_match_ratio)` lines; the
//! knapsack phase gets whatever the greedy phase left, restricted to the
//! not-yet-selected units. A knapsack failure (no feasible solution) falls
//! back to the greedy-only result instead of erroring.

use std::collections::HashSet;

use tracing::{info, warn};

use crate::config::PlannerConfig;
use crate::errors::EngineError;
use crate::external::JobProfile;
use crate::models::content::{relevance_by_story, RankedStory, SpaceBudget, Story};
use crate::models::plan::{Coverage, Plan, StorySelection};
use crate::planning::greedy::run_greedy;
use crate::planning::knapsack::run_knapsack;
use crate::scoring::skill_match::{match_score, STRONG_MATCH};

const DEFAULT_SKILL_MATCH_RATIO: f64 = 0.8;

/// One-shot hybrid planning. Pure and synchronous; use [`select_plan`] from
/// async contexts.
pub fn select_plan_sync(
    ranked_stories: &[RankedStory],
    job: &JobProfile,
    pool: &[Story],
    budget: SpaceBudget,
    config: &PlannerConfig,
) -> Result<Plan, EngineError> {
    let relevance = relevance_by_story(ranked_stories);

    // A ratio outside (0, 1] cannot split the budget meaningfully; fall back
    // to the default rather than letting the greedy phase outgrow max_lines.
    let ratio = if config.skill_match_ratio > 0.0 && config.skill_match_ratio <= 1.0 {
        config.skill_match_ratio
    } else {
        DEFAULT_SKILL_MATCH_RATIO
    };
    let greedy_budget = ((budget.max_lines as f64 * ratio).floor() as u32).min(budget.max_lines);

    let greedy = run_greedy(pool, &job.skills, greedy_budget, budget.max_bullets);
    info!(
        selected = greedy.selected_ids.len(),
        used_lines = greedy.used_lines,
        value = greedy.value,
        "hybrid: greedy phase complete"
    );

    // The greedy phase may use less than its budget if the skill list runs
    // out first — the knapsack phase gets everything actually left.
    let remaining_lines = budget.max_lines.saturating_sub(greedy.used_lines);
    let remaining_bullets = budget.max_bullets.saturating_sub(greedy.used_bullets);

    let mut selected: HashSet<String> = greedy.selected_ids.iter().cloned().collect();
    let mut total_value = greedy.value;

    if remaining_lines > 0 && remaining_bullets > 0 {
        // Remove already-selected units from the candidate pool, dropping
        // stories left with no remaining bullets.
        let filtered: Vec<Story> = pool
            .iter()
            .map(|story| Story {
                bullets: story
                    .bullets
                    .iter()
                    .filter(|b| !selected.contains(&b.id))
                    .cloned()
                    .collect(),
                ..story.clone()
            })
            .filter(|story| !story.bullets.is_empty())
            .collect();

        match run_knapsack(&filtered, &relevance, remaining_bullets, remaining_lines) {
            Ok(knapsack) => {
                total_value += knapsack.total_value;
                for (_, bullet_ids) in &knapsack.selections {
                    // Disjoint by construction (the pool was filtered), but
                    // dedupe defensively via the set.
                    for id in bullet_ids {
                        selected.insert(id.clone());
                    }
                }
                info!(
                    stories = knapsack.selections.len(),
                    used_lines = knapsack.used_lines,
                    value = knapsack.total_value,
                    "hybrid: knapsack phase complete"
                );
            }
            Err(EngineError::Solver(reason)) => {
                warn!(%reason, "hybrid: knapsack found no solution, keeping greedy result");
            }
            Err(other) => return Err(other),
        }
    }

    let selections = build_selections(pool, &selected);
    let coverage = compute_coverage(pool, &selected, job);
    let plan = Plan::new(selections, budget, coverage, total_value);
    info!(
        plan_id = %plan.id,
        bullets = plan.total_bullets(),
        lines = plan.total_lines(),
        coverage = plan.coverage.aggregate_score,
        "hybrid: plan built"
    );
    Ok(plan)
}

/// Async entry point. Planning is CPU-bound, so it runs under
/// `spawn_blocking` to keep the caller's executor unblocked.
pub async fn select_plan(
    ranked_stories: Vec<RankedStory>,
    job: JobProfile,
    pool: Vec<Story>,
    budget: SpaceBudget,
    config: PlannerConfig,
) -> Result<Plan, EngineError> {
    tokio::task::spawn_blocking(move || {
        select_plan_sync(&ranked_stories, &job, &pool, budget, &config)
    })
    .await
    .map_err(|e| EngineError::Internal(anyhow::anyhow!("planning task panicked: {e}")))?
}

/// Rebuilds the per-story selection list from the merged id set, preserving
/// pool story order and per-story bullet order.
fn build_selections(pool: &[Story], selected: &HashSet<String>) -> Vec<StorySelection> {
    pool.iter()
        .filter_map(|story| {
            let chosen: Vec<&crate::models::content::ContentUnit> = story
                .bullets
                .iter()
                .filter(|b| selected.contains(&b.id))
                .collect();
            if chosen.is_empty() {
                return None;
            }
            Some(StorySelection {
                story_id: story.id.clone(),
                estimated_lines: chosen.iter().map(|b| b.estimated_lines).sum(),
                bullet_ids: chosen.iter().map(|b| b.id.clone()).collect(),
            })
        })
        .collect()
}

/// Coverage summary: a target counts as covered when some selected unit
/// matches it strongly (same threshold the greedy skip rule uses).
fn compute_coverage(pool: &[Story], selected: &HashSet<String>, job: &JobProfile) -> Coverage {
    let selected_units: Vec<_> = pool
        .iter()
        .flat_map(|s| s.bullets.iter())
        .filter(|b| selected.contains(&b.id))
        .collect();

    let mut covered: Vec<(&str, f64)> = Vec::new();
    let mut total_weight = 0.0;
    let mut covered_weight = 0.0;

    for target in &job.skills {
        total_weight += target.weight;
        let hit = selected_units
            .iter()
            .any(|u| match_score(u, &target.name) >= STRONG_MATCH);
        if hit {
            covered.push((&target.name, target.weight));
            covered_weight += target.weight;
        }
    }

    covered.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Coverage {
        top_skills: covered.into_iter().map(|(name, _)| name.to_string()).collect(),
        aggregate_score: if total_weight > 0.0 {
            covered_weight / total_weight
        } else {
            0.0
        },
    }
}

//! The bounded repair loop: Propose → Apply → Regenerate → Render → Validate.
//!
//! # State machine
//! `Selecting → Validating → (Done | Repairing → Selecting)`, terminal on
//! `Done` (no violations), `IterationsExhausted` (violations remain at the
//! cap), or `Failed` (hard error — surfaced as an `Err`, wrapped with the
//! phase and iteration at which the collaborator failed).
//!
//! Each iteration works on deep copies of the plan and rewritten set and only
//! commits them once the full iteration succeeds, so a mid-iteration failure
//! never leaks partial state into the returned best-effort result.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PlannerConfig;
use crate::errors::EngineError;
use crate::external::{
    CandidateInfo, CompanyProfile, JobProfile, Proposer, Renderer, RendererConfig, Rewriter,
    Validator,
};
use crate::models::content::{relevance_by_story, RankedStory, RewrittenSet, Story};
use crate::models::plan::Plan;
use crate::models::violation::{attribute_with_line_map, Violation, ViolationKind};
use crate::models::RepairAction;
use crate::repair::actions::{apply_actions, validate_batch};
use crate::repair::overflow::analyze_overflow;
use crate::scoring::relevance::score_all;

/// Phase of the repair state machine. `Done` and `IterationsExhausted` are
/// the terminal states of a successful run; `Failed` is reported through the
/// error path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairState {
    Selecting,
    Validating,
    Repairing,
    Done,
    IterationsExhausted,
    Failed,
}

/// Everything the loop needs that does not change across iterations.
pub struct RepairEnv<'a> {
    pub proposer: &'a dyn Proposer,
    pub rewriter: &'a dyn Rewriter,
    pub renderer: &'a dyn Renderer,
    pub validator: &'a dyn Validator,
    pub job: &'a JobProfile,
    pub company: &'a CompanyProfile,
    pub pool: &'a [Story],
    pub ranked_stories: &'a [RankedStory],
    pub renderer_config: &'a RendererConfig,
    pub candidate: &'a CandidateInfo,
    pub max_pages: u32,
    pub max_chars_per_line: u32,
    pub config: &'a PlannerConfig,
}

/// Best-effort result of a repair run — always carries the latest state so
/// callers can inspect it even when the iteration cap was hit.
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub run_id: Uuid,
    pub plan: Plan,
    pub rewritten: RewrittenSet,
    pub document: String,
    pub violations: Vec<Violation>,
    pub iterations_used: u32,
    pub state: RepairState,
}

/// Runs the bounded repair loop until the violations clear or the configured
/// iteration cap (`PlannerConfig::max_repair_iterations`) is exhausted.
pub async fn run_repair_loop(
    env: &RepairEnv<'_>,
    initial_plan: Plan,
    initial_rewritten: RewrittenSet,
    initial_document: String,
    initial_violations: Vec<Violation>,
) -> Result<RepairOutcome, EngineError> {
    let run_id = Uuid::new_v4();
    let max_iterations = env.config.max_repair_iterations;
    let mut plan = initial_plan;
    let mut rewritten = initial_rewritten;
    let mut document = initial_document;
    let mut violations = initial_violations;
    let mut iterations = 0u32;

    info!(
        %run_id,
        violations = violations.len(),
        max_iterations,
        "repair: starting loop"
    );

    while !violations.is_empty() && iterations < max_iterations {
        iterations += 1;
        debug!(%run_id, iteration = iterations, state = ?RepairState::Repairing, "repair: iteration start");

        // Propose. The proposer's batch is re-validated structurally before
        // anything mutates; an invalid batch is fatal to the run.
        let mut actions = env
            .proposer
            .propose(
                &violations,
                &plan,
                &rewritten,
                env.ranked_stories,
                env.job,
                env.company,
            )
            .await
            .map_err(|e| phase_failure(run_id, "proposer", iterations, e))?;

        if actions.is_empty() {
            // A silent proposer still has to make progress on page overflow:
            // translate the excess into drop actions against the
            // lowest-scoring bullets.
            actions = fallback_drop_actions(env, &plan, &rewritten, &violations)?;
            if !actions.is_empty() {
                debug!(
                    iteration = iterations,
                    drops = actions.len(),
                    "repair: proposer returned no actions, using overflow drop suggestions"
                );
            }
        }

        validate_batch(
            &actions,
            &plan,
            &rewritten,
            env.ranked_stories,
            env.config.max_actions_per_batch,
        )?;

        // Apply — deterministic, no external calls, deep copies inside.
        let applied = apply_actions(&plan, &rewritten, &actions, env.ranked_stories, env.pool)?;
        debug!(
            iteration = iterations,
            actions = actions.len(),
            state = ?RepairState::Selecting,
            "repair: batch applied, reselecting content"
        );

        // Regenerate text for shorten-flagged and swap-introduced units, plus
        // anything selected but missing from the rewritten set.
        let mut regen_ids = applied.needs_regen.clone();
        for unit_id in applied.plan.selected_unit_ids() {
            if !applied.rewritten.contains_key(&unit_id) && !regen_ids.contains(&unit_id) {
                regen_ids.push(unit_id);
            }
        }

        let mut new_rewritten = if regen_ids.is_empty() {
            applied.rewritten
        } else {
            env.rewriter
                .rewrite_selective(&applied.rewritten, &regen_ids, env.job, env.company)
                .await
                .map_err(|e| phase_failure(run_id, "rewriter", iterations, e))?
        };

        let mut new_plan = applied.plan;
        let still_missing = new_plan.recompute_estimated_lines(&new_rewritten);
        for id in &still_missing {
            warn!(bullet = %id, "repair: bullet still has no rewritten text after regeneration");
        }
        for bullet in new_rewritten.values_mut() {
            bullet.target_chars = None; // intent consumed by the rewrite
        }

        // Render.
        let output = env
            .renderer
            .render(&new_plan, &new_rewritten, env.renderer_config, env.candidate)
            .await
            .map_err(|e| phase_failure(run_id, "renderer", iterations, e))?;

        // Validate.
        let mut new_violations = env
            .validator
            .validate(
                &output.document,
                env.company,
                env.max_pages,
                env.max_chars_per_line,
                Some(&output.line_map),
            )
            .await
            .map_err(|e| phase_failure(run_id, "validator", iterations, e))?;
        attribute_with_line_map(&mut new_violations, &output.line_map);

        debug!(
            iteration = iterations,
            remaining = new_violations.len(),
            state = ?RepairState::Validating,
            "repair: iteration validated"
        );

        // Commit — nothing above this point touched the current state.
        plan = new_plan;
        rewritten = new_rewritten;
        document = output.document;
        violations = new_violations;
    }

    let state = if violations.is_empty() {
        RepairState::Done
    } else {
        RepairState::IterationsExhausted
    };
    info!(
        %run_id,
        iterations_used = iterations,
        remaining = violations.len(),
        ?state,
        "repair: loop finished"
    );

    Ok(RepairOutcome {
        run_id,
        plan,
        rewritten,
        document,
        violations,
        iterations_used: iterations,
        state,
    })
}

/// Wraps a collaborator failure, logging the terminal `Failed` state before
/// the error aborts the run.
fn phase_failure(
    run_id: Uuid,
    phase: &'static str,
    iteration: u32,
    source: anyhow::Error,
) -> EngineError {
    warn!(
        %run_id,
        phase,
        iteration,
        state = ?RepairState::Failed,
        "repair: collaborator call failed, aborting run"
    );
    EngineError::external(phase, iteration, source)
}

/// Drop suggestions derived from the overflow analysis when the proposer has
/// nothing to offer: remove the N lowest-scoring bullets, where N comes from
/// translating excess pages into excess bullets.
fn fallback_drop_actions(
    env: &RepairEnv<'_>,
    plan: &Plan,
    rewritten: &RewrittenSet,
    violations: &[Violation],
) -> Result<Vec<RepairAction>, EngineError> {
    let overflowing = violations
        .iter()
        .any(|v| v.kind == ViolationKind::PageOverflow);
    if !overflowing {
        return Ok(Vec::new());
    }

    // Page count estimated from the plan's own line totals; a reported
    // overflow means at least one page over even when the estimate disagrees.
    let estimated_pages = plan.total_lines().div_ceil(env.config.lines_per_page.max(1));
    let current_pages = estimated_pages.max(env.max_pages + 1);

    let analysis = analyze_overflow(current_pages, env.max_pages, rewritten, env.config.lines_per_page);
    let to_drop = analysis.bullets_to_drop_count() as usize;
    if to_drop == 0 {
        return Ok(Vec::new());
    }

    let relevance = relevance_by_story(env.ranked_stories);
    let scored = score_all(
        plan,
        env.pool,
        &relevance,
        rewritten,
        env.job.target_max_chars,
        &env.company.banned_phrases,
    )?;

    // Ascending order: the front of the list is the best drop candidate set.
    // Capped at the batch limit; later iterations pick up the remainder.
    Ok(scored
        .iter()
        .take(to_drop.min(env.config.max_actions_per_batch))
        .map(|s| RepairAction::DropBullet {
            bullet_id: s.unit_id.clone(),
            reason: format!(
                "page overflow: {} excess lines, lowest relevance score {:.3}",
                analysis.excess_lines, s.score
            ),
        })
        .collect())
}

//! Repair-action validation and application.
//!
//! Validation is batch-level and runs before any mutation, so a malformed
//! batch never partially applies. Application is deterministic, makes no
//! external calls, and operates on deep copies of the plan and rewritten set;
//! the "shorten" half-effect is returned explicitly as a set of ids needing
//! regeneration rather than buried in control flow.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::models::content::{RankedStory, RewrittenSet, Story};
use crate::models::plan::{Plan, StorySelection};
use crate::models::RepairAction;

/// Result of applying one validated action batch.
#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub plan: Plan,
    pub rewritten: RewrittenSet,
    /// Unit ids whose text must be regenerated before the next render:
    /// shorten-flagged bullets plus everything a swap introduced. Sorted for
    /// deterministic batching.
    pub needs_regen: Vec<String>,
}

/// Structural validation of a proposed batch against the current state.
/// Rejects the whole batch on the first problem; nothing is mutated here.
pub fn validate_batch(
    actions: &[RepairAction],
    plan: &Plan,
    rewritten: &RewrittenSet,
    ranked_alternatives: &[RankedStory],
    max_batch: usize,
) -> Result<(), EngineError> {
    if actions.len() > max_batch {
        return Err(EngineError::ActionValidation(format!(
            "batch of {} actions exceeds the cap of {max_batch}",
            actions.len()
        )));
    }

    for action in actions {
        if action.reason().trim().is_empty() {
            return Err(EngineError::ActionValidation(format!(
                "{} action is missing a reason",
                action.kind()
            )));
        }

        match action {
            RepairAction::ShortenBullet {
                bullet_id,
                target_chars,
                ..
            } => {
                if *target_chars == 0 {
                    return Err(EngineError::ActionValidation(format!(
                        "shorten_bullet '{bullet_id}' requires a positive target_chars"
                    )));
                }
                if !rewritten.contains_key(bullet_id) {
                    return Err(EngineError::ActionValidation(format!(
                        "shorten_bullet references unknown bullet '{bullet_id}'"
                    )));
                }
            }
            RepairAction::DropBullet { bullet_id, .. } => {
                if !plan.contains_unit(bullet_id) {
                    return Err(EngineError::ActionValidation(format!(
                        "drop_bullet references bullet '{bullet_id}' not in the plan"
                    )));
                }
            }
            RepairAction::SwapStory { story_id, .. } => {
                if !plan.contains_story(story_id) {
                    return Err(EngineError::ActionValidation(format!(
                        "swap_story references story '{story_id}' not in the plan"
                    )));
                }
                let has_alternative = ranked_alternatives
                    .iter()
                    .any(|alt| alt.story_id != *story_id && !plan.contains_story(&alt.story_id));
                if !has_alternative {
                    return Err(EngineError::ActionValidation(format!(
                        "swap_story '{story_id}' has no unused ranked alternative"
                    )));
                }
            }
        }
    }

    Ok(())
}

/// Applies a validated batch to deep copies of the plan and rewritten set.
///
/// After all actions apply, every selection's `estimated_lines` is recomputed
/// from the rewritten set; bullets missing from it contribute 0 lines (a
/// degenerate state that is logged, not fatal — the regeneration step fills
/// the gap).
pub fn apply_actions(
    plan: &Plan,
    rewritten: &RewrittenSet,
    actions: &[RepairAction],
    ranked_alternatives: &[RankedStory],
    pool: &[Story],
) -> Result<ApplyResult, EngineError> {
    let mut plan = plan.clone();
    let mut rewritten = rewritten.clone();
    let mut needs_regen: BTreeSet<String> = BTreeSet::new();

    for action in actions {
        match action {
            RepairAction::ShortenBullet {
                bullet_id,
                target_chars,
                ..
            } => {
                let bullet = rewritten.get_mut(bullet_id).ok_or_else(|| {
                    EngineError::reference("rewritten bullet", bullet_id.clone())
                })?;
                bullet.target_chars = Some(*target_chars);
                needs_regen.insert(bullet_id.clone());
                debug!(bullet = %bullet_id, target_chars, "repair: bullet marked for shortening");
            }

            RepairAction::DropBullet { bullet_id, .. } => {
                // Idempotent: dropping an id that is already gone is a no-op.
                drop_bullet(&mut plan, &mut rewritten, bullet_id);
                needs_regen.remove(bullet_id);
            }

            RepairAction::SwapStory { story_id, .. } => {
                let introduced =
                    swap_story(&mut plan, &mut rewritten, story_id, ranked_alternatives, pool)?;
                for id in introduced {
                    needs_regen.insert(id);
                }
            }
        }
    }

    let missing = plan.recompute_estimated_lines(&rewritten);
    for id in &missing {
        if !needs_regen.contains(id) {
            warn!(bullet = %id, "repair: selected bullet has no rewritten text, counting 0 lines");
        }
    }

    Ok(ApplyResult {
        plan,
        rewritten,
        needs_regen: needs_regen.into_iter().collect(),
    })
}

fn drop_bullet(plan: &mut Plan, rewritten: &mut RewrittenSet, bullet_id: &str) {
    let mut found = false;
    for selection in &mut plan.selections {
        if let Some(pos) = selection.bullet_ids.iter().position(|id| id == bullet_id) {
            selection.bullet_ids.remove(pos);
            found = true;
            break;
        }
    }
    rewritten.remove(bullet_id);

    if found {
        // A selection left with no bullets disappears from the plan.
        plan.selections.retain(|s| !s.bullet_ids.is_empty());
        debug!(bullet = %bullet_id, "repair: bullet dropped");
    } else {
        debug!(bullet = %bullet_id, "repair: drop on absent bullet, no-op");
    }
}

/// Replaces the selection for `story_id` with the first ranked alternative
/// not already in the plan. Returns the alternative's bullet ids — all of
/// them need text regeneration.
fn swap_story(
    plan: &mut Plan,
    rewritten: &mut RewrittenSet,
    story_id: &str,
    ranked_alternatives: &[RankedStory],
    pool: &[Story],
) -> Result<Vec<String>, EngineError> {
    let position = plan
        .selections
        .iter()
        .position(|s| s.story_id == story_id)
        .ok_or_else(|| EngineError::reference("story", story_id.to_string()))?;

    let alternative_id = ranked_alternatives
        .iter()
        .find(|alt| alt.story_id != story_id && !plan.contains_story(&alt.story_id))
        .map(|alt| alt.story_id.clone())
        .ok_or_else(|| {
            EngineError::ActionValidation(format!(
                "swap_story '{story_id}' has no unused ranked alternative"
            ))
        })?;

    let alternative = pool
        .iter()
        .find(|s| s.id == alternative_id)
        .ok_or_else(|| EngineError::reference("story", alternative_id.clone()))?;

    // Old story's bullets leave the rewritten set with it.
    for bullet_id in &plan.selections[position].bullet_ids {
        rewritten.remove(bullet_id);
    }

    let bullet_ids: Vec<String> = alternative.bullets.iter().map(|b| b.id.clone()).collect();
    plan.selections[position] = StorySelection {
        story_id: alternative.id.clone(),
        estimated_lines: alternative.bullets.iter().map(|b| b.estimated_lines).sum(),
        bullet_ids: bullet_ids.clone(),
    };

    debug!(
        old = %story_id,
        new = %alternative.id,
        bullets = bullet_ids.len(),
        "repair: story swapped"
    );
    Ok(bullet_ids)
}

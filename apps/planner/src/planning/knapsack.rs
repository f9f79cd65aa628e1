//! Multi-dimensional knapsack allocator — the second phase of the hybrid
//! planner.
//!
//! The unit of choice is "which non-empty combination of bullets from this
//! story": every subset gets a `(value, bullet_cost, line_cost)` triple, and a
//! DP over `(story_index, bullets_used, lines_used)` picks the best
//! combination under both caps.
//!
//! The DP is backed by a flat arena of cells with explicit parent indices
//! rather than heap-linked state objects, so reconstruction is a
//! bounds-checked walk. Tie-breaking among equal-score final states is
//! deterministic: prefer fewer bullets, then fewer lines.
//!
//! Subset enumeration is `2^k - 1` per story. k is assumed small (bullets per
//! role); stories beyond [`MAX_SUBSET_BULLETS`] bullets are truncated with a
//! warning rather than blowing up the option table.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::errors::EngineError;
use crate::models::content::Story;

/// Capacity assumption: per-story subsets are enumerated exhaustively, so the
/// bullet count per story must stay small.
pub const MAX_SUBSET_BULLETS: usize = 8;

const W_STORY_RELEVANCE: f64 = 0.6;
const W_SKILL_COVERAGE: f64 = 0.4;

/// Relevance of a story the ranker never scored.
const UNKNOWN_STORY_RELEVANCE: f64 = 0.5;

/// One admissible bullet combination from a single story.
#[derive(Debug, Clone)]
struct SubsetOption {
    bullet_ids: Vec<String>,
    bullet_cost: u32,
    line_cost: u32,
    value: f64,
}

/// The chosen per-story subsets, in story order.
#[derive(Debug, Clone)]
pub struct KnapsackResult {
    /// `(story_id, chosen bullet ids)` pairs, in input story order.
    pub selections: Vec<(String, Vec<String>)>,
    pub total_value: f64,
    pub used_bullets: u32,
    pub used_lines: u32,
}

/// One DP cell: best score reaching this `(layer, bullets, lines)` state,
/// with the arena index of its parent and which of the layer story's subset
/// options produced it (`None` = the story was skipped).
#[derive(Debug, Clone, Copy)]
struct Cell {
    score: f64,
    parent: Option<usize>,
    choice: Option<usize>,
}

/// Solves the story-subset knapsack under joint bullet/line caps.
///
/// Fails with a `Solver` error when no non-empty combination fits the budget;
/// callers degrade gracefully by keeping their prior (greedy-only) result.
pub fn run_knapsack(
    stories: &[Story],
    story_relevance: &HashMap<String, f64>,
    max_bullets: u32,
    max_lines: u32,
) -> Result<KnapsackResult, EngineError> {
    let story_options: Vec<(usize, Vec<SubsetOption>)> = stories
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.bullets.is_empty())
        .map(|(i, s)| (i, enumerate_subsets(s, story_relevance)))
        .collect();

    let b_cap = max_bullets as usize;
    let l_cap = max_lines as usize;
    let layer_size = (b_cap + 1) * (l_cap + 1);
    let layers = story_options.len() + 1;

    // Flat arena: layers × (bullets+1) × (lines+1).
    let mut arena: Vec<Option<Cell>> = vec![None; layers * layer_size];
    let idx = |layer: usize, b: usize, l: usize| layer * layer_size + b * (l_cap + 1) + l;

    arena[idx(0, 0, 0)] = Some(Cell {
        score: 0.0,
        parent: None,
        choice: None,
    });

    for (layer, (_, options)) in story_options.iter().enumerate() {
        for b in 0..=b_cap {
            for l in 0..=l_cap {
                let here = idx(layer, b, l);
                let Some(cell) = arena[here] else { continue };

                // Skip this story: inherit the state unchanged.
                propose(&mut arena, idx(layer + 1, b, l), Cell {
                    score: cell.score,
                    parent: Some(here),
                    choice: None,
                });

                // Or include one of its subset options.
                for (j, option) in options.iter().enumerate() {
                    let nb = b + option.bullet_cost as usize;
                    let nl = l + option.line_cost as usize;
                    if nb > b_cap || nl > l_cap {
                        continue;
                    }
                    propose(&mut arena, idx(layer + 1, nb, nl), Cell {
                        score: cell.score + option.value,
                        parent: Some(here),
                        choice: Some(j),
                    });
                }
            }
        }
    }

    // Best final state with at least one bullet selected. Scanning bullets
    // then lines in ascending order plus a strict `>` comparison gives the
    // deterministic tie-break: fewer bullets, then fewer lines.
    let final_layer = layers - 1;
    let mut best: Option<(usize, usize, f64)> = None;
    for b in 1..=b_cap {
        for l in 0..=l_cap {
            if let Some(cell) = arena[idx(final_layer, b, l)] {
                if best.map(|(_, _, s)| cell.score > s).unwrap_or(true) {
                    best = Some((b, l, cell.score));
                }
            }
        }
    }

    let Some((best_b, best_l, total_value)) = best else {
        return Err(EngineError::Solver(
            "no valid solution found within the bullet/line budget".to_string(),
        ));
    };

    // Walk parent indices back through the layers, then reverse to restore
    // story order.
    let mut chosen: Vec<(usize, usize)> = Vec::new(); // (story_options index, option index)
    let mut cursor = idx(final_layer, best_b, best_l);
    for layer in (0..story_options.len()).rev() {
        let cell = arena[cursor].ok_or_else(|| {
            EngineError::Internal(anyhow::anyhow!(
                "knapsack back-pointer walk hit an empty cell at index {cursor}"
            ))
        })?;
        if let Some(j) = cell.choice {
            chosen.push((layer, j));
        }
        match cell.parent {
            Some(parent) => cursor = parent,
            None => break,
        }
    }
    chosen.reverse();

    let selections: Vec<(String, Vec<String>)> = chosen
        .iter()
        .map(|&(layer, j)| {
            let (story_idx, options) = &story_options[layer];
            (stories[*story_idx].id.clone(), options[j].bullet_ids.clone())
        })
        .collect();

    debug!(
        stories = selections.len(),
        used_bullets = best_b,
        used_lines = best_l,
        total_value,
        "knapsack: solution reconstructed"
    );

    Ok(KnapsackResult {
        selections,
        total_value,
        used_bullets: best_b as u32,
        used_lines: best_l as u32,
    })
}

/// Writes `candidate` into `slot` if it beats the incumbent. Equal scores
/// keep the incumbent, so the fixed iteration order decides ties.
fn propose(arena: &mut [Option<Cell>], slot: usize, candidate: Cell) {
    match arena[slot] {
        Some(existing) if existing.score >= candidate.score => {}
        _ => arena[slot] = Some(candidate),
    }
}

/// Enumerates every non-empty bullet subset of a story with its cost/value
/// triple. `value = 0.6·story_relevance + 0.4·subset_skill_coverage`, where
/// coverage is distinct skill tags capped at 5.
fn enumerate_subsets(story: &Story, story_relevance: &HashMap<String, f64>) -> Vec<SubsetOption> {
    let relevance = story_relevance
        .get(&story.id)
        .copied()
        .unwrap_or(UNKNOWN_STORY_RELEVANCE);

    let mut bullets = &story.bullets[..];
    if bullets.len() > MAX_SUBSET_BULLETS {
        warn!(
            story = %story.id,
            bullets = bullets.len(),
            cap = MAX_SUBSET_BULLETS,
            "knapsack: truncating story bullets for subset enumeration"
        );
        bullets = &bullets[..MAX_SUBSET_BULLETS];
    }

    let k = bullets.len();
    let mut options = Vec::with_capacity((1usize << k) - 1);

    for mask in 1u32..(1u32 << k) {
        let mut bullet_ids = Vec::new();
        let mut line_cost = 0u32;
        let mut skills: Vec<&str> = Vec::new();

        for (i, bullet) in bullets.iter().enumerate() {
            if mask & (1 << i) == 0 {
                continue;
            }
            bullet_ids.push(bullet.id.clone());
            line_cost += bullet.estimated_lines;
            for skill in &bullet.skills {
                if !skills.contains(&skill.as_str()) {
                    skills.push(skill);
                }
            }
        }

        let coverage = skills.len().min(5) as f64 / 5.0;
        options.push(SubsetOption {
            bullet_cost: bullet_ids.len() as u32,
            line_cost,
            value: W_STORY_RELEVANCE * relevance + W_SKILL_COVERAGE * coverage,
            bullet_ids,
        });
    }

    options
}

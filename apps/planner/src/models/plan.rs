//! The plan — the chosen subset of stories/bullets plus coverage metrics.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::content::{RewrittenSet, SpaceBudget};

/// One story's contribution to the plan: an ordered subset of its bullet ids.
///
/// Invariant (plan-wide): a given bullet id appears in at most one selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorySelection {
    pub story_id: String,
    pub bullet_ids: Vec<String>,
    /// Sum of the selected bullets' estimated lines. Recomputed from the
    /// rewritten set after every repair apply step.
    pub estimated_lines: u32,
}

/// Summary of how well the plan covers the weighted target skills.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coverage {
    /// Covered target skills, highest weight first.
    pub top_skills: Vec<String>,
    /// Matched target weight / total target weight, in `[0, 1]`.
    pub aggregate_score: f64,
}

/// The selected subset of content, the budget it was built against, and the
/// combined allocator value it achieved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub selections: Vec<StorySelection>,
    pub budget: SpaceBudget,
    pub coverage: Coverage,
    pub total_value: f64,
    pub created_at: DateTime<Utc>,
}

impl Plan {
    pub fn new(
        selections: Vec<StorySelection>,
        budget: SpaceBudget,
        coverage: Coverage,
        total_value: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            selections,
            budget,
            coverage,
            total_value,
            created_at: Utc::now(),
        }
    }

    pub fn total_bullets(&self) -> u32 {
        self.selections.iter().map(|s| s.bullet_ids.len() as u32).sum()
    }

    pub fn total_lines(&self) -> u32 {
        self.selections.iter().map(|s| s.estimated_lines).sum()
    }

    /// True when both budget caps hold.
    pub fn within_budget(&self) -> bool {
        self.total_bullets() <= self.budget.max_bullets
            && self.total_lines() <= self.budget.max_lines
    }

    pub fn contains_story(&self, story_id: &str) -> bool {
        self.selections.iter().any(|s| s.story_id == story_id)
    }

    pub fn contains_unit(&self, unit_id: &str) -> bool {
        self.selections
            .iter()
            .any(|s| s.bullet_ids.iter().any(|id| id == unit_id))
    }

    /// All selected bullet ids, in selection order.
    pub fn selected_unit_ids(&self) -> Vec<String> {
        self.selections
            .iter()
            .flat_map(|s| s.bullet_ids.iter().cloned())
            .collect()
    }

    /// True when no bullet id appears in two selections.
    pub fn unit_ids_unique(&self) -> bool {
        let mut seen = HashSet::new();
        self.selections
            .iter()
            .flat_map(|s| s.bullet_ids.iter())
            .all(|id| seen.insert(id.as_str()))
    }

    /// Recomputes every selection's `estimated_lines` from the rewritten set.
    /// Bullets missing from the set contribute 0 lines; the caller is expected
    /// to log that degenerate case.
    pub fn recompute_estimated_lines(&mut self, rewritten: &RewrittenSet) -> Vec<String> {
        let mut missing = Vec::new();
        for selection in &mut self.selections {
            selection.estimated_lines = selection
                .bullet_ids
                .iter()
                .map(|id| match rewritten.get(id) {
                    Some(b) => b.estimated_lines,
                    None => {
                        missing.push(id.clone());
                        0
                    }
                })
                .sum();
        }
        missing
    }
}

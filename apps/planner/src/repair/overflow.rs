//! Overflow analysis — translates "N pages over budget" into "M bullets must
//! be removed vs. shortened".

use serde::{Deserialize, Serialize};

use crate::models::content::RewrittenSet;

/// Average lines per bullet when the rewritten set is empty or unknown.
const DEFAULT_AVG_LINES_PER_UNIT: f64 = 2.0;

/// Deterministic overflow verdict. `must_drop` and `can_shorten` are mutually
/// exclusive by construction: shortening only helps when the excess is less
/// than one bullet's worth of lines.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OverflowAnalysis {
    pub excess_pages: u32,
    pub excess_lines: u32,
    pub excess_bullets: f64,
    pub can_shorten: bool,
    pub must_drop: bool,
}

impl OverflowAnalysis {
    /// The no-overflow analysis.
    pub fn none() -> Self {
        Self {
            excess_pages: 0,
            excess_lines: 0,
            excess_bullets: 0.0,
            can_shorten: false,
            must_drop: false,
        }
    }

    /// How many bullets must go to eliminate the overflow. Zero when
    /// shortening alone can absorb it.
    pub fn bullets_to_drop_count(&self) -> u32 {
        if self.must_drop {
            self.excess_bullets.ceil() as u32
        } else {
            0
        }
    }
}

/// Analyzes how far over the page budget the current render is.
///
/// The rewritten set provides the average-lines-per-unit estimate; an empty
/// set falls back to [`DEFAULT_AVG_LINES_PER_UNIT`].
pub fn analyze_overflow(
    current_pages: u32,
    max_pages: u32,
    rewritten: &RewrittenSet,
    lines_per_page: u32,
) -> OverflowAnalysis {
    if current_pages <= max_pages {
        return OverflowAnalysis::none();
    }

    let avg_lines = if rewritten.is_empty() {
        DEFAULT_AVG_LINES_PER_UNIT
    } else {
        let total: u32 = rewritten.values().map(|b| b.estimated_lines).sum();
        (total as f64 / rewritten.len() as f64).max(f64::MIN_POSITIVE)
    };

    let excess_pages = current_pages - max_pages;
    let excess_lines = excess_pages * lines_per_page;
    let excess_bullets = excess_lines as f64 / avg_lines;

    OverflowAnalysis {
        excess_pages,
        excess_lines,
        excess_bullets,
        must_drop: excess_bullets >= 1.0,
        can_shorten: excess_bullets < 1.0,
    }
}

use anyhow::{Context, Result};

use crate::models::content::ContentUnit;

/// Planner configuration loaded from environment variables.
/// Every knob has a default, so `from_env` only fails on unparseable values.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Fraction of the line budget handed to the greedy skill-match phase;
    /// the knapsack phase gets the remainder.
    pub skill_match_ratio: f64,
    /// Lines-per-page estimate used by the overflow analyzer.
    pub lines_per_page: u32,
    /// Chars-per-line estimate used to derive a bullet's line count.
    pub chars_per_line: usize,
    /// Hard cap on repair iterations.
    pub max_repair_iterations: u32,
    /// Maximum repair actions accepted per proposer batch.
    pub max_actions_per_batch: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            skill_match_ratio: 0.8,
            lines_per_page: 50,
            chars_per_line: 90,
            max_repair_iterations: 5,
            max_actions_per_batch: 5,
        }
    }
}

impl PlannerConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Self::default();
        Ok(PlannerConfig {
            skill_match_ratio: env_or("PLANNER_SKILL_MATCH_RATIO", defaults.skill_match_ratio)?,
            lines_per_page: env_or("PLANNER_LINES_PER_PAGE", defaults.lines_per_page)?,
            chars_per_line: env_or("PLANNER_CHARS_PER_LINE", defaults.chars_per_line)?,
            max_repair_iterations: env_or(
                "PLANNER_MAX_REPAIR_ITERATIONS",
                defaults.max_repair_iterations,
            )?,
            max_actions_per_batch: env_or(
                "PLANNER_MAX_ACTIONS_PER_BATCH",
                defaults.max_actions_per_batch,
            )?,
        })
    }

    /// Materializes one pool bullet, deriving its length and line estimate
    /// from this config's chars-per-line setting.
    pub fn materialize_unit(
        &self,
        id: impl Into<String>,
        story_id: impl Into<String>,
        text: impl Into<String>,
        skills: Vec<String>,
    ) -> ContentUnit {
        ContentUnit::new(id, story_id, text, skills, self.chars_per_line)
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' is not a valid value")),
        Err(_) => Ok(default),
    }
}

pub mod relevance;
pub mod skill_match;
pub mod style;

pub use relevance::{score_all, ScoredBullet};
pub use skill_match::{match_score, STRONG_MATCH};
pub use style::compute_style_flags;

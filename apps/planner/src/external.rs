//! Contracts for the four external collaborators the engine consumes.
//!
//! The planner never talks to an LLM, a template engine, or a compiler
//! directly — callers hand in implementations of these traits. Collaborator
//! failures surface as `anyhow::Error` and are wrapped by the repair loop
//! with the phase and iteration at which they occurred.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::content::{ContentUnit, RankedStory, RewrittenSet, SkillTarget};
use crate::models::plan::Plan;
use crate::models::violation::{LineMap, Violation};
use crate::models::RepairAction;

// ────────────────────────────────────────────────────────────────────────────
// Profile and config inputs
// ────────────────────────────────────────────────────────────────────────────

/// Target role profile produced by the external job-profile builder.
/// The engine only consumes the weighted skill list and the length target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProfile {
    pub title: String,
    pub skills: Vec<SkillTarget>,
    pub target_max_chars: usize,
}

/// Company-specific constraints consumed by the validator and proposer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: String,
    pub banned_phrases: Vec<String>,
}

/// Candidate identity passed through to the renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CandidateInfo {
    pub name: String,
    pub email: String,
}

/// Renderer knobs the engine forwards untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    pub template: String,
    pub font_size_pt: u8,
}

/// Rendered document text plus the line → content mapping used to attribute
/// violations back to bullets.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub document: String,
    pub line_map: LineMap,
}

// ────────────────────────────────────────────────────────────────────────────
// Collaborator traits
// ────────────────────────────────────────────────────────────────────────────

/// Suggests repair actions for the current violations. Implementations are
/// expected to return at most 5 actions; the loop re-validates the batch
/// structurally regardless of what the implementation guarantees.
#[async_trait]
pub trait Proposer: Send + Sync {
    async fn propose(
        &self,
        violations: &[Violation],
        plan: &Plan,
        rewritten: &RewrittenSet,
        ranked_alternatives: &[RankedStory],
        job: &JobProfile,
        company: &CompanyProfile,
    ) -> anyhow::Result<Vec<RepairAction>>;
}

/// Regenerates bullet text. `rewrite_selective` must preserve every unit not
/// named in `ids` verbatim — that is what keeps the repair loop selective
/// instead of a full re-rewrite per iteration.
#[async_trait]
pub trait Rewriter: Send + Sync {
    async fn rewrite(
        &self,
        units: &[ContentUnit],
        job: &JobProfile,
        company: &CompanyProfile,
    ) -> anyhow::Result<RewrittenSet>;

    async fn rewrite_selective(
        &self,
        current: &RewrittenSet,
        ids: &[String],
        job: &JobProfile,
        company: &CompanyProfile,
    ) -> anyhow::Result<RewrittenSet>;
}

/// Turns a plan plus rewritten bullets into document text and a line map.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        plan: &Plan,
        rewritten: &RewrittenSet,
        config: &RendererConfig,
        candidate: &CandidateInfo,
    ) -> anyhow::Result<RenderOutput>;
}

/// Reports constraint violations in a rendered document. The optional line
/// map lets the validator attribute line-level violations to content units.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(
        &self,
        document: &str,
        company: &CompanyProfile,
        max_pages: u32,
        max_chars_per_line: u32,
        line_map: Option<&LineMap>,
    ) -> anyhow::Result<Vec<Violation>>;
}

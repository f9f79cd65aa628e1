//! Content planning and constraint-repair engine for resume generation.
//!
//! Given a ranked pool of candidate stories (groups of bullet points), a
//! weighted set of target skills, and a space budget, the planner selects a
//! near-optimal subset of content (`select_plan`). After an external renderer
//! and validator report constraint violations, the repair loop
//! (`run_repair_loop`) iteratively mutates the plan — shorten, drop, swap —
//! until the document fits or the iteration cap is exhausted.
//!
//! The four external collaborators (proposer, rewriter, renderer, validator)
//! are consumed behind async traits in [`external`]; everything else in this
//! crate is deterministic and synchronous.

pub mod config;
pub mod errors;
pub mod external;
pub mod models;
pub mod planning;
pub mod repair;
pub mod scoring;

pub use config::PlannerConfig;
pub use errors::EngineError;
pub use models::plan::Plan;
pub use planning::hybrid::{select_plan, select_plan_sync};
pub use repair::repair_loop::{run_repair_loop, RepairOutcome, RepairState};

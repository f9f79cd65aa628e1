pub mod actions;
pub mod overflow;
pub mod repair_loop;

pub use actions::{apply_actions, validate_batch, ApplyResult};
pub use overflow::{analyze_overflow, OverflowAnalysis};
pub use repair_loop::{run_repair_loop, RepairEnv, RepairOutcome, RepairState};

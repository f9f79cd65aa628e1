//! Repair actions proposed by the external proposer.
//!
//! The tagged serde representation is the wire shape the proposer emits;
//! unknown tags fail deserialization, and `repair::actions::validate_batch`
//! re-checks every referenced id before anything is applied.

use serde::{Deserialize, Serialize};

/// A proposed edit intended to resolve one or more violations.
/// Every variant carries a mandatory human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RepairAction {
    /// Mark a bullet for external regeneration at a shorter target length.
    /// Applying this does not change text — it records intent.
    ShortenBullet {
        bullet_id: String,
        target_chars: usize,
        reason: String,
    },
    /// Remove a bullet from its selection and from the rewritten set.
    /// Idempotent: dropping an already-absent id is a no-op.
    DropBullet { bullet_id: String, reason: String },
    /// Replace a selected story with the first unused ranked alternative.
    SwapStory { story_id: String, reason: String },
}

impl RepairAction {
    pub fn reason(&self) -> &str {
        match self {
            RepairAction::ShortenBullet { reason, .. } => reason,
            RepairAction::DropBullet { reason, .. } => reason,
            RepairAction::SwapStory { reason, .. } => reason,
        }
    }

    /// Short label for logging and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RepairAction::ShortenBullet { .. } => "shorten_bullet",
            RepairAction::DropBullet { .. } => "drop_bullet",
            RepairAction::SwapStory { .. } => "swap_story",
        }
    }
}

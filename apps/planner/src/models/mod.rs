pub mod action;
pub mod content;
pub mod plan;
pub mod violation;

pub use action::RepairAction;
pub use content::{
    ContentUnit, RankedStory, RewrittenBullet, RewrittenSet, SkillTarget, SpaceBudget, Story,
    StyleFlags,
};
pub use plan::{Coverage, Plan, StorySelection};
pub use violation::{LineMap, LineRef, Severity, Violation, ViolationKind};

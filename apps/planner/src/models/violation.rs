//! Constraint violations reported by the external validator, plus the
//! line → content mapping the renderer supplies for attribution.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// The rendered document exceeds the page cap.
    PageOverflow,
    /// A printed line exceeds the character cap.
    LineTooLong,
    /// The document contains a phrase banned by the company profile.
    ForbiddenPhrase,
    /// The renderer's underlying compile step reported an error.
    RenderFailure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// Points a document line back at the content unit (and story) it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineRef {
    pub unit_id: String,
    pub story_id: String,
}

/// Line number (1-based) → originating content unit.
pub type LineMap = HashMap<u32, LineRef>;

/// A detected constraint breach in the rendered document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
    pub detail: String,
    pub line: Option<u32>,
    pub char_count: Option<u32>,
    pub unit_id: Option<String>,
    pub story_id: Option<String>,
}

impl Violation {
    pub fn new(kind: ViolationKind, severity: Severity, detail: impl Into<String>) -> Self {
        Self {
            kind,
            severity,
            detail: detail.into(),
            line: None,
            char_count: None,
            unit_id: None,
            story_id: None,
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

/// Fills in `unit_id`/`story_id` for violations that carry a line number but
/// no attribution yet. The validator normally does this itself; this is the
/// loop's backstop for validators that only report line numbers.
pub fn attribute_with_line_map(violations: &mut [Violation], line_map: &LineMap) {
    for violation in violations.iter_mut() {
        if violation.unit_id.is_some() {
            continue;
        }
        if let Some(line) = violation.line {
            if let Some(line_ref) = line_map.get(&line) {
                violation.unit_id = Some(line_ref.unit_id.clone());
                violation.story_id = Some(line_ref.story_id.clone());
            }
        }
    }
}

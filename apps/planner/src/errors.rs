use thiserror::Error;

/// Engine-level error type.
///
/// Internal deterministic failures (`Reference`, `ActionValidation`) are
/// resolved locally wherever a safe fallback exists and only escalate when
/// none does. `Solver` is always recoverable by the caller (fall back to the
/// greedy-only result). `ExternalCall` always escalates, carrying the repair
/// phase and iteration at which the collaborator failed.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown {kind} id '{id}'")]
    Reference { kind: &'static str, id: String },

    #[error("Invalid repair action: {0}")]
    ActionValidation(String),

    #[error("Solver error: {0}")]
    Solver(String),

    #[error("{phase} call failed at iteration {iteration}: {source}")]
    ExternalCall {
        phase: &'static str,
        iteration: u32,
        #[source]
        source: anyhow::Error,
    },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// Wraps a collaborator failure with the repair phase and iteration index.
    pub fn external(phase: &'static str, iteration: u32, source: anyhow::Error) -> Self {
        EngineError::ExternalCall {
            phase,
            iteration,
            source,
        }
    }

    pub fn reference(kind: &'static str, id: impl Into<String>) -> Self {
        EngineError::Reference {
            kind,
            id: id.into(),
        }
    }
}

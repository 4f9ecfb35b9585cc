use crate::gateway::ProviderError;
use crate::models::workflow::SequentialResult;
use crate::store::RegistryError;
use crate::trace::TraceError;

/// Failures that end a workflow run.
///
/// Sequential failures carry the partial result accumulated so far,
/// including the failing entry, so callers can inspect what completed.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid workflow request: {0}")]
    InvalidRequest(String),

    #[error("Step {step}: unknown agent {agent_id}")]
    UnknownAgent {
        step: usize,
        agent_id: String,
        partial: Box<SequentialResult>,
    },

    #[error("Step {step} ({agent_name}) failed: {cause}")]
    StepFailed {
        step: usize,
        agent_id: String,
        agent_name: String,
        cause: ProviderError,
        partial: Box<SequentialResult>,
    },

    #[error("Workflow run timed out after {0}s")]
    TimedOut(u64),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl WorkflowError {
    /// Partial sequential result, when the failure happened mid-chain.
    pub fn partial(&self) -> Option<&SequentialResult> {
        match self {
            Self::UnknownAgent { partial, .. } | Self::StepFailed { partial, .. } => {
                Some(partial.as_ref())
            }
            _ => None,
        }
    }
}

//! Request and result shapes that cross the workflow boundary.
//!
//! Outputs are opaque text throughout. Every result carries the id of the
//! trace its run produced so callers can fetch the span tree afterwards.

use serde::{Deserialize, Serialize};

/// One (agent, instruction) pair inside a workflow request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub agent_id: String,
    pub instruction: String,
}

impl WorkflowStep {
    pub fn new(agent_id: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            instruction: instruction.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialRequest {
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub initial_input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelRequest {
    pub steps: Vec<WorkflowStep>,
    #[serde(default)]
    pub initial_input: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorRequest {
    pub goal: String,
    pub team: Vec<String>,
    /// Overrides the engine's configured iteration cap for this run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<usize>,
}

/// A workflow request, tagged by the coordination strategy it asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WorkflowRequest {
    Sequential(SequentialRequest),
    Parallel(ParallelRequest),
    Supervisor(SupervisorRequest),
}

impl WorkflowRequest {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Sequential(_) => "sequential",
            Self::Parallel(_) => "parallel",
            Self::Supervisor(_) => "supervisor",
        }
    }
}

/// Why a single step did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepError {
    #[error("Unknown agent: {agent_id}")]
    UnknownAgent { agent_id: String },

    #[error("Agent {agent_id} is not on the team")]
    AgentNotOnTeam { agent_id: String },

    #[error("Provider error: {message}")]
    Provider { message: String },

    #[error("Step aborted: {reason}")]
    Aborted { reason: String },
}

impl StepError {
    /// Serialized `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownAgent { .. } => "unknown_agent",
            Self::AgentNotOnTeam { .. } => "agent_not_on_team",
            Self::Provider { .. } => "provider",
            Self::Aborted { .. } => "aborted",
        }
    }
}

/// Outcome of one step: its output, or the error that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    Completed { output: String },
    Failed { error: StepError },
}

impl StepOutcome {
    pub fn output(&self) -> Option<&str> {
        match self {
            Self::Completed { output } => Some(output),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&StepError> {
        match self {
            Self::Completed { .. } => None,
            Self::Failed { error } => Some(error),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

// ─── Sequential ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialEntry {
    /// 1-based position in the request.
    pub step: usize,
    pub agent_id: String,
    /// `None` when the agent id did not resolve.
    pub agent_name: Option<String>,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequentialResult {
    pub trace_id: String,
    pub steps: Vec<SequentialEntry>,
    pub final_output: String,
}

// ─── Parallel ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelEntry {
    pub agent_id: String,
    pub agent_name: Option<String>,
    pub instruction: String,
    #[serde(flatten)]
    pub outcome: StepOutcome,
}

/// Fan-out result. Entry order is not meaningful; match entries by
/// `agent_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParallelResult {
    pub trace_id: String,
    pub results: Vec<ParallelEntry>,
}

impl ParallelResult {
    pub fn entries_for(&self, agent_id: &str) -> impl Iterator<Item = &ParallelEntry> {
        let agent_id = agent_id.to_string();
        self.results.iter().filter(move |e| e.agent_id == agent_id)
    }
}

// ─── Supervisor ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorStep {
    pub step: usize,
    pub agent_id: String,
    pub agent_name: String,
    pub instruction: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// How a supervisor loop ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// The planner returned a finish decision.
    Finished,
    /// The iteration cap was hit; an expected path, not a failure.
    IterationCapReached,
    AgentNotOnTeam { agent_id: String },
    PlannerError { message: String },
    StepFailed { agent_id: String, message: String },
    NoValidAgents,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finished => "finished",
            Self::IterationCapReached => "iteration_cap_reached",
            Self::AgentNotOnTeam { .. } => "agent_not_on_team",
            Self::PlannerError { .. } => "planner_error",
            Self::StepFailed { .. } => "step_failed",
            Self::NoValidAgents => "no_valid_agents",
        }
    }

    /// Finished and cap-reached are normal endings; the rest end the loop
    /// early because something went wrong.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Finished | Self::IterationCapReached)
    }
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Finished => write!(f, "finished"),
            Self::IterationCapReached => write!(f, "iteration cap reached"),
            Self::AgentNotOnTeam { agent_id } => {
                write!(f, "agent {} is not on the team", agent_id)
            }
            Self::PlannerError { message } => write!(f, "planner error: {}", message),
            Self::StepFailed { agent_id, message } => {
                write!(f, "step for agent {} failed: {}", agent_id, message)
            }
            Self::NoValidAgents => write!(f, "no valid agents found for the team"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupervisorResult {
    pub trace_id: String,
    pub goal: String,
    pub steps: Vec<SupervisorStep>,
    pub final_output: String,
    pub termination: Termination,
}

/// Strategy-tagged workflow result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WorkflowResult {
    Sequential(SequentialResult),
    Parallel(ParallelResult),
    Supervisor(SupervisorResult),
}

impl WorkflowResult {
    pub fn trace_id(&self) -> &str {
        match self {
            Self::Sequential(r) => &r.trace_id,
            Self::Parallel(r) => &r.trace_id,
            Self::Supervisor(r) => &r.trace_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_is_tagged_by_strategy() {
        let json = serde_json::json!({
            "strategy": "parallel",
            "steps": [{ "agentId": "a1", "instruction": "review" }],
            "initialInput": "draft"
        });
        let request: WorkflowRequest = serde_json::from_value(json).unwrap();
        match request {
            WorkflowRequest::Parallel(p) => {
                assert_eq!(p.steps[0].agent_id, "a1");
                assert_eq!(p.initial_input, "draft");
            }
            other => panic!("unexpected request: {:?}", other),
        }
    }

    #[test]
    fn test_failed_entry_serializes_flat() {
        let entry = SequentialEntry {
            step: 2,
            agent_id: "ghost".to_string(),
            agent_name: None,
            outcome: StepOutcome::Failed {
                error: StepError::UnknownAgent {
                    agent_id: "ghost".to_string(),
                },
            },
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["kind"], "unknown_agent");
        assert_eq!(value["step"], 2);
    }

    #[test]
    fn test_termination_failure_classification() {
        assert!(!Termination::Finished.is_failure());
        assert!(!Termination::IterationCapReached.is_failure());
        assert!(Termination::NoValidAgents.is_failure());
    }
}

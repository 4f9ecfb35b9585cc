//! YAML workflow files for `troupe workflow run`.
//!
//! A file may declare agents inline; they are registered before the run and
//! can then be referenced by name. Any other reference is taken to be the
//! id of an already-registered agent.
//!
//! ```yaml
//! name: "Brief"
//! strategy: sequential        # sequential | parallel | supervisor
//!
//! agents:
//!   - name: Researcher
//!     role: "You research topics and list key facts."
//!     model: gpt-4
//!     temperature: 0.2
//!   - name: Writer
//!     role: "You write short briefs."
//!
//! initial_input: "Rust async runtimes"
//! steps:
//!   - agent: Researcher
//!     instruction: "Collect the key facts."
//!   - agent: Writer
//!     instruction: "Write a one-paragraph brief."
//! ```
//!
//! A supervisor file replaces `steps` / `initial_input` with `goal`, `team`
//! and an optional `max_iterations`.

use std::collections::{HashMap, HashSet};

use serde::Deserialize;

use troupe_core::models::{
    NewAgent, ParallelRequest, SequentialRequest, SupervisorRequest, WorkflowRequest,
    WorkflowStep,
};

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowFile {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Agents registered before the run, referenced by name.
    #[serde(default)]
    pub agents: Vec<NewAgent>,

    #[serde(flatten)]
    pub plan: WorkflowPlan,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum WorkflowPlan {
    Sequential {
        steps: Vec<FileStep>,
        #[serde(default)]
        initial_input: String,
    },
    Parallel {
        steps: Vec<FileStep>,
        #[serde(default)]
        initial_input: String,
    },
    Supervisor {
        goal: String,
        team: Vec<String>,
        #[serde(default)]
        max_iterations: Option<usize>,
    },
}

/// One step; `agent` is a declared agent name or a registered agent id.
#[derive(Debug, Clone, Deserialize)]
pub struct FileStep {
    pub agent: String,
    pub instruction: String,
}

impl WorkflowPlan {
    pub fn strategy_name(&self) -> &'static str {
        match self {
            Self::Sequential { .. } => "sequential",
            Self::Parallel { .. } => "parallel",
            Self::Supervisor { .. } => "supervisor",
        }
    }

    fn agent_refs(&self) -> Vec<&str> {
        match self {
            Self::Sequential { steps, .. } | Self::Parallel { steps, .. } => {
                steps.iter().map(|s| s.agent.as_str()).collect()
            }
            Self::Supervisor { team, .. } => team.iter().map(String::as_str).collect(),
        }
    }
}

impl WorkflowFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        serde_yaml::from_str(yaml).map_err(|e| format!("Failed to parse workflow YAML: {}", e))
    }

    pub fn from_file(path: &str) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read workflow file '{}': {}", path, e))?;
        Self::from_yaml(&content)
    }

    /// Structural checks that need no database: names present, declared
    /// agents unique, steps and team well-formed.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("workflow name must not be empty".to_string());
        }

        let mut seen = HashSet::new();
        for agent in &self.agents {
            if agent.name.trim().is_empty() {
                return Err("declared agents need a name".to_string());
            }
            if agent.role.trim().is_empty() {
                return Err(format!("agent '{}' needs a role", agent.name));
            }
            if !seen.insert(agent.name.as_str()) {
                return Err(format!("agent '{}' is declared twice", agent.name));
            }
        }

        match &self.plan {
            WorkflowPlan::Sequential { steps, .. } | WorkflowPlan::Parallel { steps, .. } => {
                for (i, step) in steps.iter().enumerate() {
                    if step.agent.trim().is_empty() {
                        return Err(format!("step {} has no agent", i + 1));
                    }
                    if step.instruction.trim().is_empty() {
                        return Err(format!("step {} has no instruction", i + 1));
                    }
                }
            }
            WorkflowPlan::Supervisor {
                goal,
                team,
                max_iterations,
            } => {
                if goal.trim().is_empty() {
                    return Err("supervisor goal must not be empty".to_string());
                }
                if team.is_empty() {
                    return Err("supervisor team must not be empty".to_string());
                }
                if *max_iterations == Some(0) {
                    return Err("max_iterations must be at least 1".to_string());
                }
            }
        }
        Ok(())
    }

    /// References that do not name a declared agent, in first-use order.
    /// These must be ids of agents already in the registry.
    pub fn external_refs(&self) -> Vec<String> {
        let declared: HashSet<&str> = self.agents.iter().map(|a| a.name.as_str()).collect();
        let mut seen = HashSet::new();
        self.plan
            .agent_refs()
            .into_iter()
            .filter(|r| !declared.contains(r) && seen.insert(*r))
            .map(str::to_string)
            .collect()
    }

    /// Build the engine request, mapping declared names to the ids they
    /// were registered under. Unmapped references pass through unchanged.
    pub fn to_request(&self, ids_by_name: &HashMap<String, String>) -> WorkflowRequest {
        let resolve = |r: &str| ids_by_name.get(r).cloned().unwrap_or_else(|| r.to_string());
        let steps = |steps: &[FileStep]| -> Vec<WorkflowStep> {
            steps
                .iter()
                .map(|s| WorkflowStep::new(resolve(&s.agent), s.instruction.clone()))
                .collect()
        };

        match &self.plan {
            WorkflowPlan::Sequential {
                steps: file_steps,
                initial_input,
            } => WorkflowRequest::Sequential(SequentialRequest {
                steps: steps(file_steps),
                initial_input: initial_input.clone(),
            }),
            WorkflowPlan::Parallel {
                steps: file_steps,
                initial_input,
            } => WorkflowRequest::Parallel(ParallelRequest {
                steps: steps(file_steps),
                initial_input: initial_input.clone(),
            }),
            WorkflowPlan::Supervisor {
                goal,
                team,
                max_iterations,
            } => WorkflowRequest::Supervisor(SupervisorRequest {
                goal: goal.clone(),
                team: team.iter().map(|r| resolve(r)).collect(),
                max_iterations: *max_iterations,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEQUENTIAL: &str = r#"
name: "Brief"
agents:
  - name: Researcher
    role: "You research."
    model: gpt-4
  - name: Writer
    role: "You write."
strategy: sequential
initial_input: "topic"
steps:
  - agent: Researcher
    instruction: "Collect facts."
  - agent: Writer
    instruction: "Write it up."
  - agent: a-registered-id
    instruction: "Review."
"#;

    #[test]
    fn test_parse_sequential_file() {
        let wf = WorkflowFile::from_yaml(SEQUENTIAL).unwrap();
        assert_eq!(wf.name, "Brief");
        assert_eq!(wf.agents.len(), 2);
        assert_eq!(wf.agents[0].model, "gpt-4");
        assert_eq!(wf.agents[1].provider, "openai");
        assert_eq!(wf.plan.strategy_name(), "sequential");
        wf.validate().unwrap();
        assert_eq!(wf.external_refs(), vec!["a-registered-id".to_string()]);
    }

    #[test]
    fn test_declared_names_resolve_to_ids() {
        let wf = WorkflowFile::from_yaml(SEQUENTIAL).unwrap();
        let ids = HashMap::from([
            ("Researcher".to_string(), "id-r".to_string()),
            ("Writer".to_string(), "id-w".to_string()),
        ]);
        match wf.to_request(&ids) {
            WorkflowRequest::Sequential(req) => {
                let agents: Vec<_> = req.steps.iter().map(|s| s.agent_id.as_str()).collect();
                assert_eq!(agents, vec!["id-r", "id-w", "a-registered-id"]);
                assert_eq!(req.initial_input, "topic");
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_supervisor_file() {
        let yaml = r#"
name: "Plan"
strategy: supervisor
goal: "Ship a release note"
team: [Writer, Writer, ext-1]
max_iterations: 4
agents:
  - name: Writer
    role: "You write."
"#;
        let wf = WorkflowFile::from_yaml(yaml).unwrap();
        wf.validate().unwrap();
        assert_eq!(wf.external_refs(), vec!["ext-1".to_string()]);

        let ids = HashMap::from([("Writer".to_string(), "w".to_string())]);
        match wf.to_request(&ids) {
            WorkflowRequest::Supervisor(req) => {
                assert_eq!(req.team, vec!["w", "w", "ext-1"]);
                assert_eq!(req.max_iterations, Some(4));
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[test]
    fn test_validation_errors() {
        let dup = r#"
name: "Dup"
strategy: parallel
agents:
  - { name: A, role: r }
  - { name: A, role: r }
steps: []
"#;
        let err = WorkflowFile::from_yaml(dup).unwrap().validate().unwrap_err();
        assert!(err.contains("declared twice"));

        let blank = r#"
name: "Blank"
strategy: sequential
steps:
  - agent: x
    instruction: "  "
"#;
        let err = WorkflowFile::from_yaml(blank).unwrap().validate().unwrap_err();
        assert!(err.contains("step 1"));

        let no_team = r#"
name: "Empty"
strategy: supervisor
goal: "g"
team: []
"#;
        assert!(WorkflowFile::from_yaml(no_team).unwrap().validate().is_err());
    }

    #[test]
    fn test_unknown_strategy_is_parse_error() {
        let yaml = "name: x\nstrategy: round_robin\nsteps: []\n";
        assert!(WorkflowFile::from_yaml(yaml).is_err());
    }
}

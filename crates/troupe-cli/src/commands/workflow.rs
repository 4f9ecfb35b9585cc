//! `troupe workflow` — Run YAML-defined workflows.

use std::collections::HashMap;

use console::style;
use troupe_core::models::WorkflowResult;
use troupe_core::state::AppState;

use super::print_json;
use super::trace::print_waterfall;
use crate::workflow_file::{WorkflowFile, WorkflowPlan};

/// Run a workflow from a YAML file.
///
/// Inline agents are registered first; the run's result is printed as JSON.
/// With `show_trace` the run's span tree follows as a waterfall.
pub async fn run(state: &AppState, workflow_file: &str, show_trace: bool) -> Result<(), String> {
    let workflow = WorkflowFile::from_file(workflow_file)?;
    workflow.validate()?;

    eprintln!(
        "Loaded workflow: {} ({}, {})",
        style(&workflow.name).bold(),
        workflow.plan.strategy_name(),
        workflow_file
    );

    let mut ids_by_name = HashMap::new();
    for new_agent in &workflow.agents {
        let agent = state
            .registry
            .register(new_agent.clone())
            .await
            .map_err(|e| format!("Failed to register agent '{}': {}", new_agent.name, e))?;
        eprintln!("  registered {} as {}", agent.name, style(&agent.id).dim());
        ids_by_name.insert(agent.name.clone(), agent.id);
    }

    let outcome = state.orchestrator.run(workflow.to_request(&ids_by_name)).await;
    let result = match outcome {
        Ok(result) => result,
        Err(err) => {
            if let Some(partial) = err.partial() {
                print_json(&serde_json::json!({ "error": err.to_string(), "partial": partial }));
                if show_trace {
                    show_spans(state, &partial.trace_id);
                }
            }
            state.traces.flush().await;
            return Err(err.to_string());
        }
    };

    print_json(&serde_json::to_value(&result).map_err(|e| e.to_string())?);

    if let WorkflowResult::Supervisor(supervisor) = &result {
        let line = format!("Run ended: {}", supervisor.termination);
        if supervisor.termination.is_failure() {
            eprintln!("{}", style(line).yellow());
        } else {
            eprintln!("{}", style(line).green());
        }
    }

    if show_trace {
        show_spans(state, result.trace_id());
    }
    state.traces.flush().await;
    Ok(())
}

fn show_spans(state: &AppState, trace_id: &str) {
    match state.traces.get_spans(trace_id) {
        Ok(spans) => {
            eprintln!();
            print_waterfall(&spans);
        }
        Err(e) => tracing::warn!("[Workflow] Could not read trace {}: {}", trace_id, e),
    }
}

/// Validate a workflow YAML file without executing it.
pub async fn validate(workflow_file: &str) -> Result<(), String> {
    let workflow = WorkflowFile::from_file(workflow_file)?;
    workflow.validate()?;

    println!("✅ Workflow '{}' is valid", workflow.name);
    if let Some(description) = &workflow.description {
        println!("   {}", description);
    }
    println!("   Strategy: {}", workflow.plan.strategy_name());
    println!("   Inline agents: {}", workflow.agents.len());

    match &workflow.plan {
        WorkflowPlan::Sequential { steps, .. } | WorkflowPlan::Parallel { steps, .. } => {
            println!("   Steps: {}", steps.len());
            for (i, step) in steps.iter().enumerate() {
                println!("   {}. {}: {}", i + 1, step.agent, step.instruction);
            }
        }
        WorkflowPlan::Supervisor {
            goal,
            team,
            max_iterations,
        } => {
            println!("   Goal: {}", goal);
            println!("   Team: {}", team.join(", "));
            if let Some(n) = max_iterations {
                println!("   Max iterations: {}", n);
            }
        }
    }

    let external = workflow.external_refs();
    if !external.is_empty() {
        println!(
            "   Expects registered agents: {}",
            style(external.join(", ")).yellow()
        );
    }
    Ok(())
}

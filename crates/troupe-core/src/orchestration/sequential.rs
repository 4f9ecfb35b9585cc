use async_trait::async_trait;

use super::{validate_steps, RunContext, Strategy, WorkflowError, SEQUENTIAL_ROOT};
use crate::gateway::InvocationRequest;
use crate::models::workflow::{
    SequentialEntry, SequentialRequest, SequentialResult, StepError, StepOutcome,
};
use crate::trace::{attrs, Attributes};

/// Runs steps one after another. Each step sees only the previous step's
/// output as its context, which keeps prompt size bounded.
pub struct SequentialStrategy;

#[async_trait]
impl Strategy for SequentialStrategy {
    type Request = SequentialRequest;
    type Output = SequentialResult;

    fn name(&self) -> &'static str {
        SEQUENTIAL_ROOT
    }

    async fn run(
        &self,
        ctx: &RunContext,
        request: SequentialRequest,
    ) -> Result<SequentialResult, WorkflowError> {
        validate_steps(&request.steps)?;

        let root = ctx.traces.start_root(
            SEQUENTIAL_ROOT,
            attrs([
                ("strategy", "sequential".into()),
                ("step.count", request.steps.len().into()),
            ]),
        )?;
        let trace_id = root.trace_id().to_string();
        let parent = root.span_ref().clone();

        let mut entries: Vec<SequentialEntry> = Vec::with_capacity(request.steps.len());
        let mut running = request.initial_input;

        for (i, step) in request.steps.into_iter().enumerate() {
            let index = i + 1;

            let agent = match ctx.registry.find(&step.agent_id).await {
                Ok(Some(agent)) => agent,
                Ok(None) => {
                    tracing::warn!(
                        "[Sequential] Step {} references unknown agent {}",
                        index,
                        step.agent_id
                    );
                    entries.push(SequentialEntry {
                        step: index,
                        agent_id: step.agent_id.clone(),
                        agent_name: None,
                        outcome: StepOutcome::Failed {
                            error: StepError::UnknownAgent {
                                agent_id: step.agent_id.clone(),
                            },
                        },
                    });
                    root.finish_err(
                        &format!("unknown agent {}", step.agent_id),
                        attrs([("failed.step", index.into())]),
                    )?;
                    return Err(WorkflowError::UnknownAgent {
                        step: index,
                        agent_id: step.agent_id,
                        partial: Box::new(SequentialResult {
                            trace_id,
                            steps: entries,
                            final_output: running,
                        }),
                    });
                }
                Err(e) => {
                    root.finish_err(&e.to_string(), attrs([("failed.step", index.into())]))?;
                    return Err(e.into());
                }
            };

            tracing::debug!("[Sequential] Step {} → {}", index, agent.name);
            match ctx
                .invoke_agent(
                    &parent,
                    index,
                    &agent,
                    InvocationRequest::for_agent(&agent, &step.instruction, running.as_str()),
                )
                .await?
            {
                Ok(output) => {
                    entries.push(SequentialEntry {
                        step: index,
                        agent_id: agent.id.clone(),
                        agent_name: Some(agent.name.clone()),
                        outcome: StepOutcome::Completed {
                            output: output.clone(),
                        },
                    });
                    running = output;
                }
                Err(cause) => {
                    tracing::warn!(
                        "[Sequential] Step {} ({}) failed: {}",
                        index,
                        agent.name,
                        cause
                    );
                    entries.push(SequentialEntry {
                        step: index,
                        agent_id: agent.id.clone(),
                        agent_name: Some(agent.name.clone()),
                        outcome: StepOutcome::Failed {
                            error: StepError::Provider {
                                message: cause.to_string(),
                            },
                        },
                    });
                    root.finish_err(
                        &format!("step {} ({}) failed: {}", index, agent.name, cause),
                        attrs([("failed.step", index.into())]),
                    )?;
                    return Err(WorkflowError::StepFailed {
                        step: index,
                        agent_id: agent.id,
                        agent_name: agent.name,
                        cause,
                        partial: Box::new(SequentialResult {
                            trace_id,
                            steps: entries,
                            final_output: running,
                        }),
                    });
                }
            }
        }

        root.finish_ok(attrs([("steps.completed", entries.len().into())]))?;
        Ok(SequentialResult {
            trace_id,
            steps: entries,
            final_output: running,
        })
    }
}

use async_trait::async_trait;
use tokio::task::JoinSet;

use super::{validate_steps, RunContext, Strategy, WorkflowError, PARALLEL_ROOT};
use crate::gateway::InvocationRequest;
use crate::models::workflow::{
    ParallelEntry, ParallelRequest, ParallelResult, StepError, StepOutcome, WorkflowStep,
};
use crate::trace::{attrs, SpanRef};

/// Fans every step out at once over the same input and joins.
///
/// A failing step yields an error entry for that step only; the result
/// always has exactly one entry per requested step.
pub struct ParallelStrategy;

#[async_trait]
impl Strategy for ParallelStrategy {
    type Request = ParallelRequest;
    type Output = ParallelResult;

    fn name(&self) -> &'static str {
        PARALLEL_ROOT
    }

    async fn run(
        &self,
        ctx: &RunContext,
        request: ParallelRequest,
    ) -> Result<ParallelResult, WorkflowError> {
        validate_steps(&request.steps)?;

        let root = ctx.traces.start_root(
            PARALLEL_ROOT,
            attrs([
                ("strategy", "parallel".into()),
                ("step.count", request.steps.len().into()),
            ]),
        )?;
        let trace_id = root.trace_id().to_string();
        let parent = root.span_ref().clone();

        // Dropping the JoinSet (run cancelled) aborts every worker; their
        // span guards then close as cancelled.
        let mut workers = JoinSet::new();
        for (i, step) in request.steps.iter().cloned().enumerate() {
            let ctx = ctx.clone();
            let parent = parent.clone();
            let input = request.initial_input.clone();
            workers.spawn(async move {
                let entry = run_step(&ctx, &parent, i + 1, step, &input).await;
                (i, entry)
            });
        }

        let mut slots: Vec<Option<ParallelEntry>> = vec![None; request.steps.len()];
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((i, entry)) => slots[i] = Some(entry),
                Err(e) => tracing::warn!("[Parallel] Worker did not complete: {}", e),
            }
        }

        let results: Vec<ParallelEntry> = slots
            .into_iter()
            .zip(request.steps)
            .map(|(slot, step)| {
                slot.unwrap_or_else(|| ParallelEntry {
                    agent_id: step.agent_id,
                    agent_name: None,
                    instruction: step.instruction,
                    outcome: StepOutcome::Failed {
                        error: StepError::Aborted {
                            reason: "worker aborted before completing".into(),
                        },
                    },
                })
            })
            .collect();

        let completed = results.iter().filter(|e| e.outcome.is_completed()).count();
        let failed = results.len() - completed;
        if failed > 0 {
            tracing::warn!(
                "[Parallel] {} of {} steps failed",
                failed,
                results.len()
            );
        }
        root.finish_ok(attrs([
            ("results.completed", completed.into()),
            ("results.failed", failed.into()),
        ]))?;

        Ok(ParallelResult { trace_id, results })
    }
}

/// One fan-out worker. Never fails: every problem becomes an error entry.
async fn run_step(
    ctx: &RunContext,
    parent: &SpanRef,
    index: usize,
    step: WorkflowStep,
    input: &str,
) -> ParallelEntry {
    let failed = |agent_name: Option<String>, error: StepError| ParallelEntry {
        agent_id: step.agent_id.clone(),
        agent_name,
        instruction: step.instruction.clone(),
        outcome: StepOutcome::Failed { error },
    };

    let agent = match ctx.registry.find(&step.agent_id).await {
        Ok(Some(agent)) => agent,
        Ok(None) => {
            let error = StepError::UnknownAgent {
                agent_id: step.agent_id.clone(),
            };
            record_on_root(ctx, parent, index, &error);
            return failed(None, error);
        }
        Err(e) => {
            let error = StepError::Aborted {
                reason: e.to_string(),
            };
            record_on_root(ctx, parent, index, &error);
            return failed(None, error);
        }
    };

    tracing::debug!("[Parallel] Step {} → {}", index, agent.name);
    match ctx
        .invoke_agent(
            parent,
            index,
            &agent,
            InvocationRequest::for_agent(&agent, &step.instruction, input),
        )
        .await
    {
        Ok(Ok(output)) => ParallelEntry {
            agent_id: agent.id,
            agent_name: Some(agent.name),
            instruction: step.instruction.clone(),
            outcome: StepOutcome::Completed { output },
        },
        Ok(Err(cause)) => failed(
            Some(agent.name),
            StepError::Provider {
                message: cause.to_string(),
            },
        ),
        Err(trace_err) => failed(
            Some(agent.name),
            StepError::Aborted {
                reason: trace_err.to_string(),
            },
        ),
    }
}

/// Steps that never reach the gateway open no span of their own; their error
/// is recorded on the root as `step.<n>.error`.
fn record_on_root(ctx: &RunContext, parent: &SpanRef, index: usize, error: &StepError) {
    tracing::warn!("[Parallel] Step {}: {}", index, error);
    if let Err(e) =
        ctx.traces
            .set_attribute(&parent.span_id, format!("step.{}.error", index), error.to_string())
    {
        tracing::warn!("[Parallel] Failed to record step error on root span: {}", e);
    }
}

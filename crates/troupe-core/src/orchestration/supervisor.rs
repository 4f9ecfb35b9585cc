//! Supervisor loop — a planner model picks the next agent and instruction
//! until it declares the goal finished or the iteration cap is hit.
//!
//! The loop is bounded by construction: at most `cap` planner calls, each
//! followed by at most one delegation. Every ending carries a
//! [`Termination`] and a non-empty final output.

use async_trait::async_trait;

use super::planner::{self, PlannerDecision};
use super::{RunContext, Strategy, WorkflowError, PLANNER_SPAN, SUPERVISOR_ROOT};
use crate::gateway::{InvocationRequest, PromptFraming};
use crate::models::agent::Agent;
use crate::models::workflow::{
    StepError, SupervisorRequest, SupervisorResult, SupervisorStep, Termination,
};
use crate::trace::{attrs, Attributes, SpanGuard};

pub struct SupervisorStrategy;

#[async_trait]
impl Strategy for SupervisorStrategy {
    type Request = SupervisorRequest;
    type Output = SupervisorResult;

    fn name(&self) -> &'static str {
        SUPERVISOR_ROOT
    }

    async fn run(
        &self,
        ctx: &RunContext,
        request: SupervisorRequest,
    ) -> Result<SupervisorResult, WorkflowError> {
        let goal = request.goal.trim().to_string();
        if goal.is_empty() {
            return Err(WorkflowError::InvalidRequest("goal must not be empty".into()));
        }
        if request.team.is_empty() {
            return Err(WorkflowError::InvalidRequest("team must not be empty".into()));
        }
        let cap = request
            .max_iterations
            .unwrap_or(ctx.config.max_supervisor_iterations);
        if cap == 0 {
            return Err(WorkflowError::InvalidRequest(
                "max iterations must be at least 1".into(),
            ));
        }

        let root = ctx.traces.start_root(
            SUPERVISOR_ROOT,
            attrs([
                ("strategy", "supervisor".into()),
                ("goal", goal.as_str().into()),
                ("team.size", request.team.len().into()),
                ("max_iterations", cap.into()),
            ]),
        )?;
        let trace_id = root.trace_id().to_string();

        let roster = resolve_team(ctx, &request.team).await?;
        let mut history: Vec<SupervisorStep> = Vec::new();

        let (termination, summary) = if roster.is_empty() {
            tracing::warn!("[Supervisor] No team member resolved; not calling the planner");
            (Termination::NoValidAgents, None)
        } else {
            drive(ctx, &root, &goal, &roster, cap, &mut history).await?
        };

        let final_output = summary
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| planner::synthesize(&goal, &history, &termination));

        let closing = attrs([
            ("termination", termination.as_str().into()),
            ("delegations", history.len().into()),
        ]);
        if termination.is_failure() {
            tracing::warn!("[Supervisor] Run ended early: {}", termination);
            root.finish_err(&termination.to_string(), closing)?;
        } else {
            tracing::info!(
                "[Supervisor] Run ended ({}) after {} delegations",
                termination,
                history.len()
            );
            root.finish_ok(closing)?;
        }

        Ok(SupervisorResult {
            trace_id,
            goal,
            steps: history,
            final_output,
            termination,
        })
    }
}

/// Team members that resolve, in request order, without duplicates.
async fn resolve_team(ctx: &RunContext, team: &[String]) -> Result<Vec<Agent>, WorkflowError> {
    let resolved = ctx.registry.resolve_many(team).await?;
    for id in &resolved.missing {
        tracing::warn!("[Supervisor] Dropping unknown team member {}", id);
    }
    Ok(resolved.found)
}

/// The bounded planning loop. Returns how it ended and, when the planner
/// finished, its summary.
async fn drive(
    ctx: &RunContext,
    root: &SpanGuard,
    goal: &str,
    roster: &[Agent],
    cap: usize,
    history: &mut Vec<SupervisorStep>,
) -> Result<(Termination, Option<String>), WorkflowError> {
    let persona = planner::system_prompt(goal, roster);

    for iteration in 1..=cap {
        let planner_span = root.child(PLANNER_SPAN, attrs([("iteration", iteration.into())]))?;
        let request = InvocationRequest {
            persona: persona.clone(),
            model: ctx.config.supervisor_model.clone(),
            temperature: ctx.config.supervisor_temperature,
            instruction: planner::planner_prompt(history),
            context: String::new(),
            tools: Vec::new(),
            framing: PromptFraming::Step,
        };

        let raw = match ctx.gateway.invoke(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                planner_span.finish_err(&e.to_string(), Attributes::new())?;
                return Ok((
                    Termination::PlannerError {
                        message: e.to_string(),
                    },
                    None,
                ));
            }
        };

        let decision = match planner::parse_decision(&raw) {
            Ok(decision) => decision,
            Err(message) => {
                planner_span.finish_err(&message, Attributes::new())?;
                return Ok((Termination::PlannerError { message }, None));
            }
        };

        let (agent_id, instruction, reasoning) = match decision {
            PlannerDecision::Finish { summary } => {
                planner_span.add_event(
                    "decision",
                    attrs([("next_agent_id", planner::FINISH.into())]),
                )?;
                planner_span.finish_ok(attrs([("decision", "finish".into())]))?;
                return Ok((Termination::Finished, Some(summary)));
            }
            PlannerDecision::Delegate {
                agent_id,
                instruction,
                reasoning,
            } => (agent_id, instruction, reasoning),
        };
        planner_span.add_event(
            "decision",
            attrs([
                ("next_agent_id", agent_id.as_str().into()),
                ("instruction", instruction.as_str().into()),
                ("reasoning", reasoning.as_deref().unwrap_or_default().into()),
            ]),
        )?;

        let Some(agent) = roster.iter().find(|a| a.id == agent_id) else {
            tracing::warn!(
                "[Supervisor] Planner delegated to {} which is not on the team",
                agent_id
            );
            let error = StepError::AgentNotOnTeam {
                agent_id: agent_id.clone(),
            };
            planner_span.finish_err(
                &error.to_string(),
                attrs([
                    ("decision", agent_id.as_str().into()),
                    ("error.kind", error.kind().into()),
                ]),
            )?;
            return Ok((Termination::AgentNotOnTeam { agent_id }, None));
        };
        planner_span.finish_ok(attrs([("decision", agent.id.as_str().into())]))?;

        let step = history.len() + 1;
        let transcript = planner::history_text(history);
        let context = planner::tail_chars(&transcript, ctx.config.history_window_chars);

        tracing::debug!("[Supervisor] Step {} → {}: {}", step, agent.name, instruction);
        match ctx
            .invoke_agent(
                root.span_ref(),
                step,
                agent,
                InvocationRequest::for_agent(agent, instruction.as_str(), context).delegated(),
            )
            .await?
        {
            Ok(output) => history.push(SupervisorStep {
                step,
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                instruction,
                output,
                reasoning,
            }),
            Err(cause) => {
                return Ok((
                    Termination::StepFailed {
                        agent_id: agent.id.clone(),
                        message: cause.to_string(),
                    },
                    None,
                ));
            }
        }
    }

    Ok((Termination::IterationCapReached, None))
}

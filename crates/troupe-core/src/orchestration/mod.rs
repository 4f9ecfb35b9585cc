//! Orchestrator — runs workflow requests across registered agents.
//!
//! Three coordination strategies share one shape:
//!   1. Resolve the agent against the registry
//!   2. Open a child span under the run's root span
//!   3. Invoke the model gateway
//!   4. Close the span (ok / error) and record the outcome
//!
//! Each strategy implements [`Strategy`]; the [`Orchestrator`] validates a
//! request, picks the strategy, and applies the configured run timeout.

mod error;
mod parallel;
pub mod planner;
mod sequential;
mod supervisor;

pub use error::WorkflowError;
pub use parallel::ParallelStrategy;
pub use sequential::SequentialStrategy;
pub use supervisor::SupervisorStrategy;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::gateway::{InvocationRequest, ModelGateway, ProviderError};
use crate::models::agent::Agent;
use crate::models::workflow::{
    ParallelRequest, ParallelResult, SequentialRequest, SequentialResult, SupervisorRequest,
    SupervisorResult, WorkflowRequest, WorkflowResult, WorkflowStep,
};
use crate::store::AgentRegistry;
use crate::trace::{attrs, Attributes, SpanRef, TraceError, TraceStore, OUTPUT_CHARS};

pub const SEQUENTIAL_ROOT: &str = "sequential-workflow";
pub const PARALLEL_ROOT: &str = "parallel-workflow";
pub const SUPERVISOR_ROOT: &str = "supervisor-workflow";
pub const PLANNER_SPAN: &str = "planner";

// ─── Run Context ────────────────────────────────────────────────────────

/// Services one run needs. Cheap to clone; parallel workers each get a copy.
#[derive(Clone)]
pub struct RunContext {
    pub registry: AgentRegistry,
    pub gateway: Arc<dyn ModelGateway>,
    pub traces: TraceStore,
    pub config: Arc<EngineConfig>,
}

impl RunContext {
    /// Invoke `agent` with `request` inside its own child span of `parent`.
    ///
    /// The outer `Result` is trace-store misuse; the inner one is the
    /// provider outcome, already recorded on the span. If the returned
    /// future is dropped mid-call the span closes as cancelled.
    pub(crate) async fn invoke_agent(
        &self,
        parent: &SpanRef,
        step: usize,
        agent: &Agent,
        request: InvocationRequest,
    ) -> Result<Result<String, ProviderError>, TraceError> {
        let span = self.traces.start_child(
            parent,
            &agent.name,
            attrs([
                ("agent.id", agent.id.as_str().into()),
                ("agent.model", agent.model.to_string().into()),
                ("agent.tools", request.tools.join(",").into()),
                ("step", step.into()),
            ]),
        )?;

        match self.gateway.invoke(&request).await {
            Ok(output) => {
                span.finish_ok(attrs([(OUTPUT_CHARS, output.chars().count().into())]))?;
                Ok(Ok(output))
            }
            Err(e) => {
                span.finish_err(&e.to_string(), Attributes::new())?;
                Ok(Err(e))
            }
        }
    }
}

// ─── Strategy ───────────────────────────────────────────────────────────

#[async_trait]
pub trait Strategy: Send + Sync {
    type Request: Send + 'static;
    type Output: Send;

    /// Root span name for runs of this strategy.
    fn name(&self) -> &'static str;

    async fn run(
        &self,
        ctx: &RunContext,
        request: Self::Request,
    ) -> Result<Self::Output, WorkflowError>;
}

fn validate_steps(steps: &[WorkflowStep]) -> Result<(), WorkflowError> {
    for (i, step) in steps.iter().enumerate() {
        if step.agent_id.trim().is_empty() {
            return Err(WorkflowError::InvalidRequest(format!(
                "step {} has an empty agent id",
                i + 1
            )));
        }
    }
    Ok(())
}

// ─── Orchestrator ───────────────────────────────────────────────────────

/// Entry point for workflow runs.
#[derive(Clone)]
pub struct Orchestrator {
    ctx: RunContext,
}

impl Orchestrator {
    pub fn new(
        registry: AgentRegistry,
        gateway: Arc<dyn ModelGateway>,
        traces: TraceStore,
        config: EngineConfig,
    ) -> Self {
        Self {
            ctx: RunContext {
                registry,
                gateway,
                traces,
                config: Arc::new(config),
            },
        }
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn config(&self) -> &EngineConfig {
        &self.ctx.config
    }

    pub async fn run_sequential(
        &self,
        request: SequentialRequest,
    ) -> Result<SequentialResult, WorkflowError> {
        self.execute(&SequentialStrategy, request).await
    }

    pub async fn run_parallel(
        &self,
        request: ParallelRequest,
    ) -> Result<ParallelResult, WorkflowError> {
        self.execute(&ParallelStrategy, request).await
    }

    pub async fn run_supervisor(
        &self,
        request: SupervisorRequest,
    ) -> Result<SupervisorResult, WorkflowError> {
        self.execute(&SupervisorStrategy, request).await
    }

    /// Dispatch a strategy-tagged request.
    pub async fn run(&self, request: WorkflowRequest) -> Result<WorkflowResult, WorkflowError> {
        match request {
            WorkflowRequest::Sequential(r) => {
                self.run_sequential(r).await.map(WorkflowResult::Sequential)
            }
            WorkflowRequest::Parallel(r) => self.run_parallel(r).await.map(WorkflowResult::Parallel),
            WorkflowRequest::Supervisor(r) => {
                self.run_supervisor(r).await.map(WorkflowResult::Supervisor)
            }
        }
    }

    async fn execute<S: Strategy>(
        &self,
        strategy: &S,
        request: S::Request,
    ) -> Result<S::Output, WorkflowError> {
        tracing::info!("[Orchestrator] Starting {}", strategy.name());
        let result = self
            .with_timeout(strategy.run(&self.ctx, request))
            .await;
        match &result {
            Ok(_) => tracing::info!("[Orchestrator] {} finished", strategy.name()),
            Err(e) => tracing::warn!("[Orchestrator] {} failed: {}", strategy.name(), e),
        }
        result
    }

    /// Apply the configured run timeout. An elapsed timeout drops the run
    /// future, which closes its open spans as cancelled.
    async fn with_timeout<T, F>(&self, fut: F) -> Result<T, WorkflowError>
    where
        F: Future<Output = Result<T, WorkflowError>>,
    {
        match self.ctx.config.run_timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), fut)
                .await
                .map_err(|_| WorkflowError::TimedOut(secs))?,
            None => fut.await,
        }
    }
}

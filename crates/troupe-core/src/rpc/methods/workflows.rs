//! RPC methods for running workflows.
//!
//! Methods:
//! - `workflows.runSequential` — chain steps, each seeing the previous output
//! - `workflows.runParallel`   — fan steps out over the same input
//! - `workflows.runSupervisor` — planner-driven delegation across a team
//!
//! A sequential run that stops part-way returns a `WORKFLOW_FAILED` error
//! whose `data.partial` holds the steps produced so far.

use crate::models::workflow::{
    ParallelRequest, ParallelResult, SequentialRequest, SequentialResult, SupervisorRequest,
    SupervisorResult,
};
use crate::rpc::error::RpcError;
use crate::state::AppState;

pub async fn run_sequential(
    state: &AppState,
    params: SequentialRequest,
) -> Result<SequentialResult, RpcError> {
    Ok(state.orchestrator.run_sequential(params).await?)
}

pub async fn run_parallel(
    state: &AppState,
    params: ParallelRequest,
) -> Result<ParallelResult, RpcError> {
    Ok(state.orchestrator.run_parallel(params).await?)
}

pub async fn run_supervisor(
    state: &AppState,
    params: SupervisorRequest,
) -> Result<SupervisorResult, RpcError> {
    Ok(state.orchestrator.run_supervisor(params).await?)
}

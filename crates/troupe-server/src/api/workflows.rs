//! Workflow endpoints.
//!
//! - `POST /api/workflows/sequential`
//! - `POST /api/workflows/parallel`
//! - `POST /api/workflows/supervisor`
//!
//! A sequential run that stops part-way answers with an error status and a
//! body of `{ "error": ..., "partial": SequentialResult }`.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use crate::error::ServerError;
use crate::state::AppState;
use troupe_core::models::{
    ParallelRequest, ParallelResult, SequentialRequest, SequentialResult, SupervisorRequest,
    SupervisorResult,
};
use troupe_core::orchestration::WorkflowError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sequential", post(run_sequential))
        .route("/parallel", post(run_parallel))
        .route("/supervisor", post(run_supervisor))
}

/// HTTP rendering of a failed run, keeping any partial result.
pub struct WorkflowFailure(WorkflowError);

impl From<WorkflowError> for WorkflowFailure {
    fn from(err: WorkflowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for WorkflowFailure {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        let partial = self
            .0
            .partial()
            .and_then(|p| serde_json::to_value(p).ok());
        let status = ServerError::from(self.0).status_code();

        let mut body = serde_json::json!({ "error": message });
        if let Some(partial) = partial {
            body["partial"] = partial;
        }
        (status, Json(body)).into_response()
    }
}

async fn run_sequential(
    State(state): State<AppState>,
    Json(body): Json<SequentialRequest>,
) -> Result<Json<SequentialResult>, WorkflowFailure> {
    Ok(Json(state.orchestrator.run_sequential(body).await?))
}

async fn run_parallel(
    State(state): State<AppState>,
    Json(body): Json<ParallelRequest>,
) -> Result<Json<ParallelResult>, WorkflowFailure> {
    Ok(Json(state.orchestrator.run_parallel(body).await?))
}

async fn run_supervisor(
    State(state): State<AppState>,
    Json(body): Json<SupervisorRequest>,
) -> Result<Json<SupervisorResult>, WorkflowFailure> {
    Ok(Json(state.orchestrator.run_supervisor(body).await?))
}

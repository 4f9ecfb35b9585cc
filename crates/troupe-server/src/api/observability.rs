//! Read-only trace endpoints for observability tooling.
//!
//! The span list is already in the shape a waterfall view needs: sorted by
//! start time, each with its parent id and timestamps.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::ServerError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 20;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/traces", get(list_traces))
        .route("/traces/{id}", get(get_trace))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    limit: Option<usize>,
}

/// GET /api/observability/traces?limit=N
async fn list_traces(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let traces = state
        .traces
        .list_recent_traces(query.limit.unwrap_or(DEFAULT_LIMIT))?;
    Ok(Json(serde_json::json!({ "traces": traces })))
}

/// GET /api/observability/traces/{id} — spans ordered by start time; an
/// unknown id yields an empty list.
async fn get_trace(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let spans = state.traces.get_spans(&id)?;
    Ok(Json(serde_json::json!({ "traceId": id, "spans": spans })))
}

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};

use crate::error::ServerError;
use crate::state::AppState;
use troupe_core::models::{Agent, NewAgent};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agents))
        .route("/register", post(register_agent))
        .route("/{id}", get(get_agent))
}

async fn list_agents(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let agents = state.registry.list().await?;
    Ok(Json(serde_json::json!({ "agents": agents })))
}

async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Agent>, ServerError> {
    state
        .registry
        .find(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ServerError::NotFound(format!("Agent {} not found", id)))
}

async fn register_agent(
    State(state): State<AppState>,
    Json(body): Json<NewAgent>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let agent = state.registry.register(body).await?;
    Ok(Json(serde_json::json!({ "agentId": agent.id, "agent": agent })))
}

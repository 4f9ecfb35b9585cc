//! RPC methods for the agent registry.
//!
//! Methods:
//! - `agents.register` — register a new agent
//! - `agents.list`     — list agents in registration order
//! - `agents.get`      — get a single agent by id

use serde::{Deserialize, Serialize};

use crate::error::ServerError;
use crate::models::agent::{Agent, NewAgent};
use crate::rpc::error::RpcError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// agents.register
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResult {
    pub agent_id: String,
    pub agent: Agent,
}

pub async fn register(state: &AppState, params: NewAgent) -> Result<RegisterResult, RpcError> {
    let agent = state
        .registry
        .register(params)
        .await
        .map_err(ServerError::from)?;
    Ok(RegisterResult {
        agent_id: agent.id.clone(),
        agent,
    })
}

// ---------------------------------------------------------------------------
// agents.list
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ListResult {
    pub agents: Vec<Agent>,
}

pub async fn list(state: &AppState) -> Result<ListResult, RpcError> {
    let agents = state.registry.list().await.map_err(ServerError::from)?;
    Ok(ListResult { agents })
}

// ---------------------------------------------------------------------------
// agents.get
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetParams {
    pub id: String,
}

pub async fn get(state: &AppState, params: GetParams) -> Result<Agent, RpcError> {
    Ok(state
        .registry
        .get(&params.id)
        .await
        .map_err(ServerError::from)?)
}

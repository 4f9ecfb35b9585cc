//! `troupe agent` — Agent registry commands.

use troupe_core::rpc::RpcRouter;
use troupe_core::state::AppState;

use super::finish_rpc;

/// Registration flags, passed through as `agents.register` params.
#[derive(Debug, Clone)]
pub struct RegisterArgs {
    pub name: String,
    pub role: String,
    pub description: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub tools: Vec<String>,
}

impl RegisterArgs {
    fn to_params(&self) -> serde_json::Value {
        let mut params = serde_json::json!({
            "name": self.name,
            "role": self.role,
            "tools": self.tools,
        });
        if let Some(description) = &self.description {
            params["description"] = serde_json::json!(description);
        }
        if let Some(provider) = &self.provider {
            params["provider"] = serde_json::json!(provider);
        }
        if let Some(model) = &self.model {
            params["model"] = serde_json::json!(model);
        }
        if let Some(temperature) = self.temperature {
            params["temperature"] = serde_json::json!(temperature);
        }
        params
    }
}

pub async fn register(state: &AppState, args: &RegisterArgs) -> Result<(), String> {
    let router = RpcRouter::new(state.clone());
    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "agents.register",
            "params": args.to_params()
        }))
        .await;
    finish_rpc(&response)
}

pub async fn list(state: &AppState) -> Result<(), String> {
    let router = RpcRouter::new(state.clone());
    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "agents.list"
        }))
        .await;
    finish_rpc(&response)
}

pub async fn get(state: &AppState, agent_id: &str) -> Result<(), String> {
    let router = RpcRouter::new(state.clone());
    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "agents.get",
            "params": { "id": agent_id }
        }))
        .await;
    finish_rpc(&response)
}

//! Transport-agnostic JSON-RPC 2.0 dispatcher.
//!
//! `RpcRouter` takes an `AppState` and dispatches incoming JSON-RPC requests
//! to the appropriate method handler. It has no HTTP dependency, so the same
//! router backs the axum `/api/rpc` endpoint and the `troupe rpc` command.

use serde::Serialize;

use crate::state::AppState;

use super::error::RpcError;
use super::methods;
use super::types::*;

const SERIALIZE_FAILURE: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Failed to serialize response"},"id":null}"#;

/// Transport-agnostic JSON-RPC router.
///
/// ```ignore
/// let router = RpcRouter::new(app_state);
/// let response_json = router.handle_request(raw_json_str).await;
/// ```
#[derive(Clone)]
pub struct RpcRouter {
    state: AppState,
}

impl RpcRouter {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Handle a raw JSON string (single request or batch) and return the
    /// serialized response.
    pub async fn handle_request(&self, raw: &str) -> String {
        if let Ok(batch) = serde_json::from_str::<Vec<JsonRpcRequest>>(raw) {
            let mut responses = Vec::with_capacity(batch.len());
            for req in batch {
                responses.push(self.dispatch(req).await);
            }
            return serde_json::to_string(&responses).unwrap_or_else(|_| SERIALIZE_FAILURE.into());
        }

        let request: JsonRpcRequest = match serde_json::from_str(raw) {
            Ok(req) => req,
            Err(e) => {
                return serde_json::to_string(&JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Parse error: {}", e),
                ))
                .unwrap_or_else(|_| SERIALIZE_FAILURE.into());
            }
        };

        let response = self.dispatch(request).await;
        serde_json::to_string(&response).unwrap_or_else(|_| SERIALIZE_FAILURE.into())
    }

    /// Handle a pre-parsed `serde_json::Value` (e.g. from axum's JSON
    /// extractor).
    pub async fn handle_value(&self, value: serde_json::Value) -> serde_json::Value {
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(req) => req,
            Err(e) => {
                return serde_json::to_value(JsonRpcResponse::error(
                    None,
                    PARSE_ERROR,
                    format!("Invalid request: {}", e),
                ))
                .unwrap_or_default();
            }
        };

        let response = self.dispatch(request).await;
        serde_json::to_value(response).unwrap_or_default()
    }

    pub async fn dispatch(&self, req: JsonRpcRequest) -> JsonRpcResponse {
        if !req.has_supported_version() {
            return JsonRpcResponse::error(
                req.id,
                INVALID_REQUEST,
                "Invalid JSON-RPC version, expected \"2.0\"",
            );
        }

        let id = req.id.clone();
        let params = req
            .params
            .unwrap_or(serde_json::Value::Object(Default::default()));

        tracing::debug!("[RpcRouter] {}", req.method);
        match self.route(&req.method, params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => err.to_response(id),
        }
    }

    async fn route(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, RpcError> {
        match method {
            // ----- Agents -----
            "agents.register" => {
                let p = parse_params(params)?;
                to_value(methods::agents::register(&self.state, p).await?)
            }
            "agents.list" => to_value(methods::agents::list(&self.state).await?),
            "agents.get" => {
                let p = parse_params(params)?;
                to_value(methods::agents::get(&self.state, p).await?)
            }

            // ----- Workflows -----
            "workflows.runSequential" => {
                let p = parse_params(params)?;
                to_value(methods::workflows::run_sequential(&self.state, p).await?)
            }
            "workflows.runParallel" => {
                let p = parse_params(params)?;
                to_value(methods::workflows::run_parallel(&self.state, p).await?)
            }
            "workflows.runSupervisor" => {
                let p = parse_params(params)?;
                to_value(methods::workflows::run_supervisor(&self.state, p).await?)
            }

            // ----- Traces -----
            "traces.list" => {
                let p = parse_params(params)?;
                to_value(methods::traces::list(&self.state, p).await?)
            }
            "traces.get" => {
                let p = parse_params(params)?;
                to_value(methods::traces::get(&self.state, p).await?)
            }

            _ => Err(RpcError::MethodNotFound(method.to_string())),
        }
    }

    /// All supported RPC method names.
    pub fn method_list(&self) -> Vec<&'static str> {
        vec![
            "agents.register",
            "agents.list",
            "agents.get",
            "workflows.runSequential",
            "workflows.runParallel",
            "workflows.runSupervisor",
            "traces.list",
            "traces.get",
        ]
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, RpcError> {
    serde_json::from_value(value).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(value)
        .map_err(|e| RpcError::Internal(format!("Failed to serialize result: {}", e)))
}

//! RPC error type that bridges engine errors to JSON-RPC errors.

use super::types;
use crate::error::ServerError;
use crate::orchestration::WorkflowError;

#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    /// A workflow run stopped part-way; `data` carries what was produced.
    #[error("Workflow failed: {message}")]
    WorkflowFailed {
        message: String,
        data: serde_json::Value,
    },
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            RpcError::NotFound(_) => types::NOT_FOUND,
            RpcError::BadRequest(_) => types::BAD_REQUEST,
            RpcError::Internal(_) => types::INTERNAL_ERROR,
            RpcError::InvalidParams(_) => types::INVALID_PARAMS,
            RpcError::MethodNotFound(_) => types::METHOD_NOT_FOUND,
            RpcError::Timeout(_) => types::TIMEOUT,
            RpcError::WorkflowFailed { .. } => types::WORKFLOW_FAILED,
        }
    }

    pub fn to_response(&self, id: Option<serde_json::Value>) -> types::JsonRpcResponse {
        let error = types::JsonRpcError::new(self.code(), self.to_string());
        let error = match self {
            RpcError::WorkflowFailed { data, .. } => error.with_data(data.clone()),
            _ => error,
        };
        types::JsonRpcResponse::failure(id, error)
    }
}

impl From<ServerError> for RpcError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::NotFound(msg) => RpcError::NotFound(msg),
            ServerError::BadRequest(msg) => RpcError::BadRequest(msg),
            ServerError::Timeout(msg) => RpcError::Timeout(msg),
            ServerError::Database(msg) => RpcError::Internal(msg),
            ServerError::Internal(msg) => RpcError::Internal(msg),
        }
    }
}

impl From<WorkflowError> for RpcError {
    fn from(err: WorkflowError) -> Self {
        if let Some(partial) = err.partial() {
            let data = serde_json::json!({
                "kind": match &err {
                    WorkflowError::UnknownAgent { .. } => "unknown_agent",
                    _ => "step_failed",
                },
                "partial": partial,
            });
            return RpcError::WorkflowFailed {
                message: err.to_string(),
                data,
            };
        }
        ServerError::from(err).into()
    }
}

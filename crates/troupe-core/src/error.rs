//! Boundary error type for the troupe engine.
//!
//! `ServerError` is what transports (RPC, HTTP, CLI) see. Module errors
//! convert into it. When the `axum` feature is enabled, it also implements
//! `IntoResponse` so it can be used directly as an axum handler error type.

use crate::db::DbError;
use crate::gateway::ProviderError;
use crate::orchestration::WorkflowError;
use crate::store::RegistryError;
use crate::trace::TraceError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DbError> for ServerError {
    fn from(err: DbError) -> Self {
        ServerError::Database(err.0)
    }
}

impl From<RegistryError> for ServerError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::InvalidAgent(msg) => ServerError::BadRequest(msg),
            RegistryError::NotFound(id) => ServerError::NotFound(format!("Agent {}", id)),
            RegistryError::Database(e) => ServerError::Database(e.0),
        }
    }
}

impl From<TraceError> for ServerError {
    fn from(err: TraceError) -> Self {
        match err {
            TraceError::UnknownTrace(id) => ServerError::NotFound(format!("Trace {}", id)),
            TraceError::UnknownSpan(id) => ServerError::NotFound(format!("Span {}", id)),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<ProviderError> for ServerError {
    fn from(err: ProviderError) -> Self {
        ServerError::Internal(err.to_string())
    }
}

impl From<WorkflowError> for ServerError {
    fn from(err: WorkflowError) -> Self {
        match err {
            WorkflowError::InvalidRequest(msg) => ServerError::BadRequest(msg),
            WorkflowError::UnknownAgent { .. } => ServerError::NotFound(err.to_string()),
            WorkflowError::StepFailed { .. } => ServerError::Internal(err.to_string()),
            WorkflowError::TimedOut(_) => ServerError::Timeout(err.to_string()),
            WorkflowError::Registry(e) => e.into(),
            WorkflowError::Trace(e) => e.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl ServerError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;

        match self {
            ServerError::Database(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}

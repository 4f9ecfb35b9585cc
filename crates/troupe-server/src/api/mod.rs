pub mod agents;
pub mod observability;
pub mod rpc;
pub mod workflows;

use axum::Router;

use crate::state::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/agents", agents::router())
        .nest("/api/workflows", workflows::router())
        .nest("/api/observability", observability::router())
        .nest("/api/rpc", rpc::router())
}

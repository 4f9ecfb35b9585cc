//! JSON-RPC 2.0 endpoint powered by `troupe_core::rpc`.
//!
//! Exposes `POST /api/rpc` for all method calls (single or batch) and
//! `GET /api/rpc/methods` for discovery.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::rpc::RpcRouter;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(rpc_handler))
        .route("/methods", get(list_methods))
}

/// POST /api/rpc
async fn rpc_handler(State(state): State<AppState>, body: String) -> Json<serde_json::Value> {
    let rpc = RpcRouter::new(state);
    let raw = rpc.handle_request(&body).await;
    Json(serde_json::from_str(&raw).unwrap_or(serde_json::Value::Null))
}

/// GET /api/rpc/methods
async fn list_methods(State(state): State<AppState>) -> Json<serde_json::Value> {
    let rpc = RpcRouter::new(state);
    Json(serde_json::json!({ "methods": rpc.method_list() }))
}

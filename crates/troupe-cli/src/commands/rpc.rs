//! `troupe rpc` — Raw JSON-RPC invocation.

use troupe_core::rpc::RpcRouter;
use troupe_core::state::AppState;

use super::{finish_rpc, print_json};

pub async fn call(state: &AppState, method: &str, params_str: &str) -> Result<(), String> {
    let params: serde_json::Value =
        serde_json::from_str(params_str).map_err(|e| format!("Invalid JSON params: {}", e))?;

    let router = RpcRouter::new(state.clone());
    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        }))
        .await;

    finish_rpc(&response)
}

/// Print every method the router answers to.
pub fn methods(state: &AppState) {
    let router = RpcRouter::new(state.clone());
    print_json(&serde_json::json!({ "methods": router.method_list() }));
}

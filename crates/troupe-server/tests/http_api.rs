//! HTTP round trips against a server bound to an ephemeral port.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use troupe_core::gateway::{EchoGateway, InvocationRequest, ModelGateway, ProviderError};
use troupe_core::{AppStateInner, Database, EngineConfig};
use troupe_server::{start_server_with_state, ServerConfig};

/// Fails for the "broken" persona, echoes otherwise.
struct PickyGateway;

#[async_trait]
impl ModelGateway for PickyGateway {
    async fn invoke(&self, request: &InvocationRequest) -> Result<String, ProviderError> {
        if request.persona == "broken" {
            return Err(ProviderError::Transport("connection reset".into()));
        }
        EchoGateway.invoke(request).await
    }
}

async fn spawn_server(gateway: Arc<dyn ModelGateway>) -> SocketAddr {
    let db = Database::open_in_memory().unwrap();
    let state = Arc::new(AppStateInner::new(db, gateway, EngineConfig::default()));
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };
    start_server_with_state(config, state).await.unwrap()
}

async fn register(client: &reqwest::Client, base: &str, name: &str, role: &str) -> String {
    let body: Value = client
        .post(format!("{}/api/agents/register", base))
        .json(&json!({ "name": name, "role": role }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["agentId"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn health_agents_workflow_and_traces() {
    let addr = spawn_server(Arc::new(EchoGateway)).await;
    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();

    let health: Value = client
        .get(format!("{}/api/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    let id = register(&client, &base, "Summarizer", "summarizer").await;

    let agent: Value = client
        .get(format!("{}/api/agents/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(agent["name"], "Summarizer");

    let missing = client
        .get(format!("{}/api/agents/nope", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 404);

    let result: Value = client
        .post(format!("{}/api/workflows/sequential", base))
        .json(&json!({
            "steps": [{ "agentId": id, "instruction": "summarize: X" }],
            "initialInput": "X"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["steps"].as_array().unwrap().len(), 1);
    let trace_id = result["traceId"].as_str().unwrap().to_string();

    let traces: Value = client
        .get(format!("{}/api/observability/traces?limit=5", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(traces["traces"][0]["traceId"], trace_id.as_str());

    let spans: Value = client
        .get(format!("{}/api/observability/traces/{}", base, trace_id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(spans["spans"].as_array().unwrap().len(), 2);
    assert!(spans["spans"][0]["parentId"].is_null());
}

#[tokio::test]
async fn invalid_registration_is_bad_request() {
    let addr = spawn_server(Arc::new(EchoGateway)).await;
    let response = reqwest::Client::new()
        .post(format!("http://{}/api/agents/register", addr))
        .json(&json!({ "name": "", "role": "x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("name"));
}

#[tokio::test]
async fn failed_chain_returns_partial_result() {
    let addr = spawn_server(Arc::new(PickyGateway)).await;
    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();
    let ok = register(&client, &base, "Fine", "fine").await;
    let broken = register(&client, &base, "Broken", "broken").await;

    let response = client
        .post(format!("{}/api/workflows/sequential", base))
        .json(&json!({
            "steps": [
                { "agentId": ok, "instruction": "one" },
                { "agentId": broken, "instruction": "two" },
                { "agentId": ok, "instruction": "three" }
            ],
            "initialInput": "in"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["partial"]["steps"].as_array().unwrap().len(), 2);
    assert_eq!(body["partial"]["steps"][1]["status"], "failed");
}

#[tokio::test]
async fn parallel_over_http_and_rpc_batch() {
    let addr = spawn_server(Arc::new(EchoGateway)).await;
    let base = format!("http://{}", addr);
    let client = reqwest::Client::new();
    let a = register(&client, &base, "A", "alpha").await;

    let result: Value = client
        .post(format!("{}/api/workflows/parallel", base))
        .json(&json!({
            "steps": [
                { "agentId": a, "instruction": "x" },
                { "agentId": "ghost", "instruction": "y" }
            ],
            "initialInput": "shared"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(result["results"].as_array().unwrap().len(), 2);

    let batch: Value = client
        .post(format!("{}/api/rpc", base))
        .body(
            json!([
                { "jsonrpc": "2.0", "id": 1, "method": "agents.list" },
                { "jsonrpc": "2.0", "id": 2, "method": "traces.list", "params": { "limit": 1 } }
            ])
            .to_string(),
        )
        .header("content-type", "application/json")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(batch[0]["result"]["agents"].as_array().unwrap().len(), 1);
    assert_eq!(batch[1]["result"]["traces"].as_array().unwrap().len(), 1);
}

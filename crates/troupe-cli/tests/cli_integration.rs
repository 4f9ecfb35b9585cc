//! Integration tests for the troupe-cli commands.
//!
//! These exercise the same code paths as the binary: the JSON-RPC router the
//! `agent` and `rpc` commands drive, and the workflow-file runner, all over
//! the offline echo gateway with in-memory or temporary databases.

use std::sync::Arc;

use troupe_cli::commands;
use troupe_cli::workflow_file::WorkflowFile;
use troupe_core::gateway::EchoGateway;
use troupe_core::rpc::RpcRouter;
use troupe_core::state::{AppState, AppStateInner};
use troupe_core::trace::SpanReader;
use troupe_core::{Database, EngineConfig};

/// Create an in-memory AppState for testing.
fn test_state() -> AppState {
    let db = Database::open(":memory:").expect("Failed to open in-memory database");
    Arc::new(AppStateInner::new(
        db,
        Arc::new(EchoGateway::new()),
        EngineConfig::default(),
    ))
}

async fn register(router: &RpcRouter, name: &str, role: &str) -> String {
    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "agents.register",
            "params": { "name": name, "role": role }
        }))
        .await;
    response["result"]["agentId"]
        .as_str()
        .expect("Expected agentId")
        .to_string()
}

#[tokio::test]
async fn test_agent_register_list_get() {
    let router = RpcRouter::new(test_state());

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "agents.register",
            "params": {
                "name": "Researcher",
                "role": "You research.",
                "model": "gpt-4",
                "tools": ["search", "search"]
            }
        }))
        .await;

    let result = response.get("result").expect("Expected result");
    let agent_id = result["agentId"].as_str().expect("Expected agentId");
    let agent = result.get("agent").expect("Expected agent");
    assert_eq!(agent["name"], "Researcher");
    assert_eq!(agent["model"]["provider"], "openai");
    assert_eq!(agent["model"]["model"], "gpt-4");
    assert_eq!(agent["tools"], serde_json::json!(["search"]));

    register(&router, "Writer", "You write.").await;

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "agents.list"
        }))
        .await;
    let agents = response["result"]["agents"].as_array().expect("Expected agents");
    assert_eq!(agents.len(), 2);
    assert_eq!(agents[0]["name"], "Researcher");
    assert_eq!(agents[1]["name"], "Writer");

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "agents.get",
            "params": { "id": agent_id }
        }))
        .await;
    assert_eq!(response["result"]["id"], agent_id);

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 4,
            "method": "agents.get",
            "params": { "id": "missing" }
        }))
        .await;
    assert_eq!(response["error"]["code"], -32001);
}

#[tokio::test]
async fn test_sequential_run_and_trace_lookup() {
    let router = RpcRouter::new(test_state());
    let researcher = register(&router, "Researcher", "You research.").await;
    let writer = register(&router, "Writer", "You write.").await;

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "workflows.runSequential",
            "params": {
                "steps": [
                    { "agentId": researcher, "instruction": "Collect facts." },
                    { "agentId": writer, "instruction": "Write it up." }
                ],
                "initialInput": "Rust"
            }
        }))
        .await;

    let result = response.get("result").expect("Expected result");
    let steps = result["steps"].as_array().expect("Expected steps");
    assert_eq!(steps.len(), 2);
    assert_eq!(steps[1]["status"], "completed");
    assert_eq!(result["finalOutput"], steps[1]["output"]);
    let trace_id = result["traceId"].as_str().unwrap();

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "traces.get",
            "params": { "traceId": trace_id }
        }))
        .await;
    let spans = response["result"]["spans"].as_array().expect("Expected spans");
    assert_eq!(spans.len(), 3);
    assert!(spans[0]["parentId"].is_null());
    assert_eq!(spans[1]["name"], "Researcher");
    assert_eq!(spans[2]["name"], "Writer");

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "traces.list",
            "params": { "limit": 5 }
        }))
        .await;
    assert_eq!(response["result"]["traces"][0]["traceId"], trace_id);
}

#[tokio::test]
async fn test_sequential_unknown_agent_returns_partial() {
    let router = RpcRouter::new(test_state());
    let writer = register(&router, "Writer", "You write.").await;

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "workflows.runSequential",
            "params": {
                "steps": [
                    { "agentId": writer, "instruction": "Draft." },
                    { "agentId": "ghost", "instruction": "Review." },
                    { "agentId": writer, "instruction": "Polish." }
                ]
            }
        }))
        .await;

    let error = response.get("error").expect("Expected error");
    assert_eq!(error["code"], -32003);
    let partial = &error["data"]["partial"];
    assert_eq!(partial["steps"].as_array().unwrap().len(), 2);
    assert_eq!(partial["steps"][1]["error"]["kind"], "unknown_agent");
}

#[tokio::test]
async fn test_offline_supervisor_still_terminates() {
    let router = RpcRouter::new(test_state());
    let writer = register(&router, "Writer", "You write.").await;

    let response = router
        .handle_value(serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "workflows.runSupervisor",
            "params": { "goal": "Write a haiku", "team": [writer] }
        }))
        .await;

    let result = response.get("result").expect("Expected result");
    // The echo gateway never answers with a planner decision.
    assert_eq!(result["termination"]["reason"], "planner_error");
    assert!(!result["finalOutput"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_workflow_file_run_registers_inline_agents() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("troupe.db");
    let trace_dir = dir.path().join("spans");
    let workflow_path = dir.path().join("brief.yaml");
    std::fs::write(
        &workflow_path,
        r#"
name: "Brief"
strategy: parallel
agents:
  - name: Optimist
    role: "You see upsides."
  - name: Skeptic
    role: "You see risks."
initial_input: "Adopt Rust for the CLI"
steps:
  - agent: Optimist
    instruction: "List upsides."
  - agent: Skeptic
    instruction: "List risks."
"#,
    )
    .unwrap();

    let config = EngineConfig {
        trace_dir: Some(trace_dir.clone()),
        ..EngineConfig::default()
    };
    let state = commands::init_state(db_path.to_str().unwrap(), config, true).unwrap();
    commands::workflow::run(&state, workflow_path.to_str().unwrap(), false)
        .await
        .unwrap();

    let agents = state.registry.list().await.unwrap();
    let names: Vec<_> = agents.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Optimist", "Skeptic"]);

    // The run was flushed to disk before returning.
    let traces = SpanReader::new(&trace_dir).list_traces(10).await.unwrap();
    assert_eq!(traces.len(), 1);
    assert_eq!(traces[0].root_name, "parallel-workflow");
    assert_eq!(traces[0].span_count, 3);
}

#[tokio::test]
async fn test_workflow_file_with_unknown_reference_fails() {
    let dir = tempfile::tempdir().unwrap();
    let workflow_path = dir.path().join("broken.yaml");
    std::fs::write(
        &workflow_path,
        r#"
name: "Broken"
strategy: sequential
steps:
  - agent: not-registered
    instruction: "Do it."
"#,
    )
    .unwrap();

    let wf = WorkflowFile::from_file(workflow_path.to_str().unwrap()).unwrap();
    assert_eq!(wf.external_refs(), vec!["not-registered".to_string()]);

    let err = commands::workflow::run(&test_state(), workflow_path.to_str().unwrap(), false)
        .await
        .unwrap_err();
    assert!(err.contains("not-registered"));
}

//! Troupe Server — HTTP backend for the agent orchestration engine.
//!
//! Provides:
//! - A RESTful HTTP API via axum (agents, workflows, observability)
//! - The JSON-RPC 2.0 endpoint at `/api/rpc`
//! - SQLite-backed agent registry via troupe-core
//!
//! This crate can be used standalone (`troupe server`) or embedded: build an
//! `AppState` yourself and pass it to [`start_server_with_state`].

pub mod api;

pub use troupe_core::{error, rpc, state};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use troupe_core::gateway::{EchoGateway, HttpGateway, ModelGateway};
use troupe_core::{AppState, AppStateInner, Database, EngineConfig};

/// Configuration for the troupe HTTP server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub engine: EngineConfig,
    /// Answer with the deterministic echo gateway instead of calling
    /// provider APIs.
    pub offline: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3210,
            db_path: "troupe.db".to_string(),
            engine: EngineConfig::default(),
            offline: false,
        }
    }
}

/// Create a shared `AppState` from a database path and engine settings.
pub async fn create_app_state(
    db_path: &str,
    engine: EngineConfig,
    offline: bool,
) -> Result<AppState, String> {
    let db = Database::open(db_path).map_err(|e| format!("Failed to open database: {}", e))?;

    let gateway: Arc<dyn ModelGateway> = if offline {
        Arc::new(EchoGateway::new())
    } else {
        Arc::new(HttpGateway::new())
    };

    Ok(Arc::new(AppStateInner::new(db, gateway, engine)))
}

/// Build the full axum application around `state`.
pub fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the server: install logging, open the database, bind, serve.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "troupe_server=info,tower_http=info".into()),
        )
        .try_init();

    tracing::info!(
        "Starting troupe server on {}:{}",
        config.host,
        config.port
    );

    let state = create_app_state(&config.db_path, config.engine.clone(), config.offline).await?;

    start_server_with_state(config, state).await
}

/// Start the HTTP server with a pre-built `AppState`.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let app = build_app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("troupe server listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "troupe-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

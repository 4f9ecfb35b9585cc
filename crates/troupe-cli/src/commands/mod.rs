//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses
//! the troupe-core engine through `AppState`.

pub mod agent;
pub mod rpc;
pub mod server;
pub mod trace;
pub mod workflow;

use std::path::PathBuf;
use std::sync::Arc;

use troupe_core::gateway::{EchoGateway, HttpGateway, ModelGateway};
use troupe_core::state::{AppState, AppStateInner};
use troupe_core::{Database, EngineConfig};

/// Engine settings gathered from global flags.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// YAML file holding an `EngineConfig`.
    pub config_file: Option<String>,
    pub max_iterations: Option<usize>,
    pub run_timeout_secs: Option<u64>,
    pub trace_dir: Option<String>,
}

/// Resolve the engine config: file (or defaults), then `TROUPE_*`
/// environment variables, then explicit flags.
pub fn load_engine_config(options: &EngineOptions) -> Result<EngineConfig, String> {
    let base = match &options.config_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| format!("Failed to read config '{}': {}", path, e))?;
            EngineConfig::from_yaml(&content)
                .map_err(|e| format!("Invalid config '{}': {}", path, e))?
        }
        None => EngineConfig::default(),
    };

    let mut config = base.with_env_overrides(|key| std::env::var(key).ok());
    if let Some(n) = options.max_iterations {
        if n == 0 {
            return Err("--max-iterations must be at least 1".to_string());
        }
        config.max_supervisor_iterations = n;
    }
    if let Some(secs) = options.run_timeout_secs {
        config.run_timeout_secs = Some(secs);
    }
    if let Some(dir) = &options.trace_dir {
        config.trace_dir = Some(PathBuf::from(dir));
    }
    Ok(config)
}

/// Open the database and wire the engine around it.
///
/// `offline` swaps the provider gateway for the deterministic echo gateway.
pub fn init_state(db_path: &str, config: EngineConfig, offline: bool) -> Result<AppState, String> {
    let db = Database::open(db_path)
        .map_err(|e| format!("Failed to open database '{}': {}", db_path, e))?;

    let gateway: Arc<dyn ModelGateway> = if offline {
        Arc::new(EchoGateway::new())
    } else {
        Arc::new(HttpGateway::new())
    };

    Ok(Arc::new(AppStateInner::new(db, gateway, config)))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Turn a JSON-RPC response into a CLI result: print it, and fail when it
/// carries an error so the process exits non-zero.
pub fn finish_rpc(response: &serde_json::Value) -> Result<(), String> {
    print_json(response);
    match response.get("error") {
        Some(err) => Err(err
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("request failed")
            .to_string()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = load_engine_config(&EngineOptions {
            max_iterations: Some(3),
            run_timeout_secs: Some(30),
            trace_dir: Some("/tmp/troupe-spans".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.max_supervisor_iterations, 3);
        assert_eq!(config.run_timeout_secs, Some(30));
        assert_eq!(config.trace_dir, Some(PathBuf::from("/tmp/troupe-spans")));
    }

    #[test]
    fn test_config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.yaml");
        std::fs::write(
            &path,
            "maxSupervisorIterations: 4\nsupervisorModel:\n  provider: anthropic\n  model: claude-3-haiku\n",
        )
        .unwrap();
        let config = load_engine_config(&EngineOptions {
            config_file: Some(path.to_string_lossy().to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(config.supervisor_model.to_string(), "anthropic/claude-3-haiku");
        assert_eq!(config.history_window_chars, 2000);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let err = load_engine_config(&EngineOptions {
            max_iterations: Some(0),
            ..Default::default()
        })
        .unwrap_err();
        assert!(err.contains("max-iterations"));
    }
}

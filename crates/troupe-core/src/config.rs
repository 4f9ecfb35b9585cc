//! Engine configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::models::agent::ModelRef;

pub const DEFAULT_MAX_SUPERVISOR_ITERATIONS: usize = 10;
pub const DEFAULT_HISTORY_WINDOW_CHARS: usize = 2000;

pub const ENV_MAX_ITERATIONS: &str = "TROUPE_MAX_ITERATIONS";
pub const ENV_RUN_TIMEOUT_SECS: &str = "TROUPE_RUN_TIMEOUT_SECS";
pub const ENV_TRACE_DIR: &str = "TROUPE_TRACE_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Hard cap on supervisor delegations per run.
    pub max_supervisor_iterations: usize,
    /// Model the supervisor planner runs on.
    pub supervisor_model: ModelRef,
    pub supervisor_temperature: f64,
    /// How much trailing history a delegated worker sees.
    pub history_window_chars: usize,
    /// Wall-clock limit for a whole run; unlimited when `None`.
    pub run_timeout_secs: Option<u64>,
    /// Where closed spans are appended as JSONL; in-memory only when `None`.
    pub trace_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_supervisor_iterations: DEFAULT_MAX_SUPERVISOR_ITERATIONS,
            supervisor_model: ModelRef::new("openai", "gpt-4"),
            supervisor_temperature: 0.0,
            history_window_chars: DEFAULT_HISTORY_WINDOW_CHARS,
            run_timeout_secs: None,
            trace_dir: None,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `TROUPE_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup. Unparseable values are
    /// ignored with a warning.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_ITERATIONS) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => self.max_supervisor_iterations = n,
                _ => tracing::warn!("[Config] Ignoring invalid {}={}", ENV_MAX_ITERATIONS, raw),
            }
        }
        if let Some(raw) = lookup(ENV_RUN_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.run_timeout_secs = Some(secs),
                _ => tracing::warn!("[Config] Ignoring invalid {}={}", ENV_RUN_TIMEOUT_SECS, raw),
            }
        }
        if let Some(raw) = lookup(ENV_TRACE_DIR) {
            if !raw.trim().is_empty() {
                self.trace_dir = Some(PathBuf::from(raw.trim()));
            }
        }
        self
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

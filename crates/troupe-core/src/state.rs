//! Shared application state for every transport.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::db::Database;
use crate::gateway::ModelGateway;
use crate::orchestration::Orchestrator;
use crate::store::AgentRegistry;
use crate::trace::{SpanWriter, TraceStore};

/// Services constructed once at startup and injected into handlers.
pub struct AppStateInner {
    pub db: Database,
    pub registry: AgentRegistry,
    pub traces: TraceStore,
    pub orchestrator: Orchestrator,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Wire the registry, trace store and orchestrator around `db`.
    ///
    /// When `config.trace_dir` is set and a tokio runtime is available,
    /// closed spans are also appended to JSONL files there.
    pub fn new(db: Database, gateway: Arc<dyn ModelGateway>, config: EngineConfig) -> Self {
        let traces = match &config.trace_dir {
            Some(dir) => match SpanWriter::spawn(dir) {
                Ok(writer) => TraceStore::with_writer(writer),
                Err(e) => {
                    tracing::warn!("[AppState] Trace sink disabled: {}", e);
                    TraceStore::new()
                }
            },
            None => TraceStore::new(),
        };
        Self::with_traces(db, gateway, config, traces)
    }

    /// Like [`AppStateInner::new`] with an explicit trace store (for
    /// example one backed by a JSONL writer).
    pub fn with_traces(
        db: Database,
        gateway: Arc<dyn ModelGateway>,
        config: EngineConfig,
        traces: TraceStore,
    ) -> Self {
        let registry = AgentRegistry::new(db.clone());
        let orchestrator = Orchestrator::new(registry.clone(), gateway, traces.clone(), config);
        Self {
            db,
            registry,
            traces,
            orchestrator,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        self.orchestrator.config()
    }
}

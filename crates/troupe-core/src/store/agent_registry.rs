use chrono::Utc;
use rusqlite::{OptionalExtension, Row};

use crate::db::{Database, DbError};
use crate::models::agent::{Agent, ModelRef, NewAgent};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid agent: {0}")]
    InvalidAgent(String),

    #[error("Agent {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] DbError),
}

/// Result of [`AgentRegistry::resolve_many`].
#[derive(Debug, Clone, Default)]
pub struct Resolved {
    pub found: Vec<Agent>,
    pub missing: Vec<String>,
}

/// Agent registry: id → definition, in registration order.
///
/// Writes are visible to the next `get`/`list` immediately; the underlying
/// connection mutex serializes concurrent registrations.
#[derive(Clone)]
pub struct AgentRegistry {
    db: Database,
}

const SELECT_COLUMNS: &str =
    "id, name, role, description, provider, model, temperature, tools, created_at";

impl AgentRegistry {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Registry over a fresh in-memory database.
    pub fn in_memory() -> Result<Self, RegistryError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Validate and store a new agent, returning the stored definition with
    /// its freshly allocated id.
    pub async fn register(&self, new_agent: NewAgent) -> Result<Agent, RegistryError> {
        let agent = build_agent(new_agent)?;
        let a = agent.clone();
        let tools = serde_json::to_string(&a.tools)
            .map_err(|e| RegistryError::InvalidAgent(format!("Invalid tools: {}", e)))?;

        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO agents (id, name, role, description, provider, model, temperature, tools, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        a.id,
                        a.name,
                        a.role,
                        a.description,
                        a.model.provider,
                        a.model.model,
                        a.temperature,
                        tools,
                        a.created_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;

        tracing::info!(
            "[AgentRegistry] Registered agent '{}' ({}) on {}",
            agent.name,
            agent.id,
            agent.model
        );
        Ok(agent)
    }

    pub async fn find(&self, agent_id: &str) -> Result<Option<Agent>, RegistryError> {
        let id = agent_id.to_string();
        let agent = self
            .db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM agents WHERE id = ?1",
                    SELECT_COLUMNS
                ))?;
                stmt.query_row(rusqlite::params![id], |row| Ok(row_to_agent(row)))
                    .optional()
            })
            .await?;
        Ok(agent)
    }

    pub async fn get(&self, agent_id: &str) -> Result<Agent, RegistryError> {
        self.find(agent_id)
            .await?
            .ok_or_else(|| RegistryError::NotFound(agent_id.to_string()))
    }

    /// Look up several ids at once, in request order and without
    /// duplicates. Ids that do not resolve are reported, not dropped.
    pub async fn resolve_many(&self, agent_ids: &[String]) -> Result<Resolved, RegistryError> {
        let mut resolved = Resolved::default();
        for id in agent_ids {
            if resolved.found.iter().any(|a| &a.id == id) || resolved.missing.contains(id) {
                continue;
            }
            match self.find(id).await? {
                Some(agent) => resolved.found.push(agent),
                None => resolved.missing.push(id.clone()),
            }
        }
        Ok(resolved)
    }

    /// All agents in registration order.
    pub async fn list(&self) -> Result<Vec<Agent>, RegistryError> {
        let agents = self
            .db
            .with_conn_async(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM agents ORDER BY seq ASC",
                    SELECT_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_agent(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(agents)
    }
}

fn build_agent(new_agent: NewAgent) -> Result<Agent, RegistryError> {
    let name = new_agent.name.trim();
    if name.is_empty() {
        return Err(RegistryError::InvalidAgent("name must not be empty".into()));
    }
    let role = new_agent.role.trim();
    if role.is_empty() {
        return Err(RegistryError::InvalidAgent("role must not be empty".into()));
    }
    let model = new_agent.model_ref();
    if model.provider.is_empty() || model.model.is_empty() {
        return Err(RegistryError::InvalidAgent(
            "model reference needs both provider and model".into(),
        ));
    }
    if !new_agent.temperature.is_finite() || !(0.0..=2.0).contains(&new_agent.temperature) {
        return Err(RegistryError::InvalidAgent(format!(
            "temperature {} is outside 0.0..=2.0",
            new_agent.temperature
        )));
    }

    Ok(Agent {
        id: uuid::Uuid::new_v4().to_string(),
        name: name.to_string(),
        role: role.to_string(),
        description: new_agent.description.trim().to_string(),
        model,
        temperature: new_agent.temperature,
        tools: new_agent.normalized_tools(),
        created_at: Utc::now(),
    })
}

fn row_to_agent(row: &Row<'_>) -> Agent {
    let tools_str: String = row.get(7).unwrap_or_default();
    let tools: Vec<String> = serde_json::from_str(&tools_str).unwrap_or_default();
    let created_ms: i64 = row.get(8).unwrap_or(0);

    Agent {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        role: row.get(2).unwrap_or_default(),
        description: row.get(3).unwrap_or_default(),
        model: ModelRef::new(
            row.get::<_, String>(4).unwrap_or_default(),
            row.get::<_, String>(5).unwrap_or_default(),
        ),
        temperature: row.get(6).unwrap_or(crate::models::agent::DEFAULT_TEMPERATURE),
        tools,
        created_at: chrono::DateTime::from_timestamp_millis(created_ms)
            .unwrap_or_else(Utc::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_register_then_get_and_list() {
        let registry = AgentRegistry::in_memory().unwrap();
        let agent = registry
            .register(
                NewAgent::new("Summarizer", "summarizer")
                    .with_model(ModelRef::new("groq", "llama3-8b"))
                    .with_tools(["search"]),
            )
            .await
            .unwrap();

        let fetched = registry.get(&agent.id).await.unwrap();
        assert_eq!(fetched.name, "Summarizer");
        assert_eq!(fetched.model, ModelRef::new("groq", "llama3-8b"));
        assert_eq!(fetched.tools, vec!["search"]);

        let all = registry.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, agent.id);
    }

    #[tokio::test]
    async fn test_list_preserves_registration_order() {
        let registry = AgentRegistry::in_memory().unwrap();
        let mut ids = Vec::new();
        for name in ["first", "second", "third"] {
            ids.push(registry.register(NewAgent::new(name, "role")).await.unwrap().id);
        }
        let listed: Vec<String> = registry
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_register_rejects_blank_name_and_role() {
        let registry = AgentRegistry::in_memory().unwrap();
        let err = registry.register(NewAgent::new("  ", "role")).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAgent(_)));
        let err = registry.register(NewAgent::new("name", "")).await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAgent(_)));
        assert!(registry.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_register_rejects_out_of_range_temperature() {
        let registry = AgentRegistry::in_memory().unwrap();
        let err = registry
            .register(NewAgent::new("hot", "role").with_temperature(5.0))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidAgent(_)));
    }

    #[tokio::test]
    async fn test_ids_are_unique_under_concurrent_registration() {
        let registry = AgentRegistry::in_memory().unwrap();
        let mut handles = Vec::new();
        for i in 0..16 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .register(NewAgent::new(format!("agent-{}", i), "worker"))
                    .await
                    .unwrap()
                    .id
            }));
        }
        let mut ids = HashSet::new();
        for handle in handles {
            assert!(ids.insert(handle.await.unwrap()));
        }
        assert_eq!(registry.list().await.unwrap().len(), 16);
    }

    #[tokio::test]
    async fn test_resolve_many_dedups_and_reports_missing() {
        let registry = AgentRegistry::in_memory().unwrap();
        let a = registry.register(NewAgent::new("a", "role")).await.unwrap();
        let b = registry.register(NewAgent::new("b", "role")).await.unwrap();

        let ids = vec![
            b.id.clone(),
            "ghost".to_string(),
            a.id.clone(),
            b.id.clone(),
            "ghost".to_string(),
        ];
        let resolved = registry.resolve_many(&ids).await.unwrap();
        let found: Vec<&str> = resolved.found.iter().map(|x| x.id.as_str()).collect();
        assert_eq!(found, vec![b.id.as_str(), a.id.as_str()]);
        assert_eq!(resolved.missing, vec!["ghost".to_string()]);
    }

    #[tokio::test]
    async fn test_get_unknown_is_not_found() {
        let registry = AgentRegistry::in_memory().unwrap();
        assert!(registry.find("missing").await.unwrap().is_none());
        assert!(matches!(
            registry.get("missing").await,
            Err(RegistryError::NotFound(_))
        ));
    }
}

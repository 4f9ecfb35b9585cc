use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROVIDER: &str = "openai";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Provider + model name pair an agent is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelRef {
    pub provider: String,
    pub model: String,
}

impl ModelRef {
    pub fn new(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

impl Default for ModelRef {
    fn default() -> Self {
        Self::new(DEFAULT_PROVIDER, DEFAULT_MODEL)
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.model)
    }
}

/// A registered agent: persona, model binding and tool capabilities.
///
/// Agents are immutable once registered; other components hold the id and
/// a snapshot obtained from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    pub model: ModelRef,
    pub temperature: f64,
    #[serde(default)]
    pub tools: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    /// Roster line used when describing a team to the supervisor planner.
    pub fn roster_line(&self) -> String {
        format!("- {} (ID: {}): {}", self.name, self.id, self.role)
    }
}

/// Registration input for a new agent.
///
/// Field layout is flat (`provider` / `model`) so the same shape can be
/// accepted from JSON-RPC params, HTTP bodies and workflow YAML files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAgent {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default)]
    pub tools: Vec<String>,
}

fn default_provider() -> String {
    DEFAULT_PROVIDER.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

impl NewAgent {
    pub fn new(name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            description: String::new(),
            provider: default_provider(),
            model: default_model(),
            temperature: DEFAULT_TEMPERATURE,
            tools: Vec::new(),
        }
    }

    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.provider = model.provider;
        self.model = model.model;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tools = tools.into_iter().map(Into::into).collect();
        self
    }

    pub fn model_ref(&self) -> ModelRef {
        ModelRef::new(self.provider.trim(), self.model.trim())
    }

    /// Capability set as an ordered set: trimmed, blanks dropped, first
    /// occurrence wins.
    pub fn normalized_tools(&self) -> Vec<String> {
        let mut tools: Vec<String> = Vec::with_capacity(self.tools.len());
        for tool in &self.tools {
            let tool = tool.trim();
            if !tool.is_empty() && !tools.iter().any(|t| t == tool) {
                tools.push(tool.to_string());
            }
        }
        tools
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_defaults_from_json() {
        let agent: NewAgent =
            serde_json::from_str(r#"{"name":"Writer","role":"You write prose."}"#).unwrap();
        assert_eq!(agent.provider, "openai");
        assert_eq!(agent.model, "gpt-3.5-turbo");
        assert_eq!(agent.temperature, 0.7);
        assert!(agent.tools.is_empty());
    }

    #[test]
    fn test_normalized_tools_keeps_first_occurrence_order() {
        let agent = NewAgent::new("a", "b").with_tools(["search", " calculator", "search", ""]);
        assert_eq!(agent.normalized_tools(), vec!["search", "calculator"]);
    }

    #[test]
    fn test_model_ref_display() {
        assert_eq!(ModelRef::new("groq", "llama3").to_string(), "groq/llama3");
    }
}

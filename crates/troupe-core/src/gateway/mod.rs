//! Model invocation gateway — one call surface over heterogeneous
//! language-model providers.
//!
//! The engine sees a gateway as a black box: a call either returns text or
//! fails once with a [`ProviderError`]. Retry and timeout policy belong to
//! the implementation; the engine never retries.

mod echo;
mod http;

pub use echo::EchoGateway;
pub use http::HttpGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::agent::{Agent, ModelRef};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Transport(String),

    #[error("{provider} returned {status}: {body}")]
    Status {
        provider: String,
        status: u16,
        body: String,
    },

    #[error("Failed to decode provider response: {0}")]
    Decode(String),

    #[error("Provider not configured: {0}")]
    Configuration(String),

    #[error("Unsupported provider: '{0}'")]
    UnsupportedProvider(String),
}

/// How the instruction and its context are laid out in the user turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptFraming {
    /// A workflow step working on the previous output or the shared input.
    #[default]
    Step,
    /// A worker receiving an instruction chosen by the supervisor's planner.
    Delegated,
}

/// Everything a provider needs to realize one agent response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationRequest {
    /// System persona (the agent's role text).
    pub persona: String,
    pub model: ModelRef,
    pub temperature: f64,
    pub instruction: String,
    /// Text the instruction operates on; may be empty.
    pub context: String,
    /// Tool capabilities the provider may call on the agent's behalf.
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub framing: PromptFraming,
}

impl InvocationRequest {
    pub fn for_agent(
        agent: &Agent,
        instruction: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            persona: agent.role.clone(),
            model: agent.model.clone(),
            temperature: agent.temperature,
            instruction: instruction.into(),
            context: context.into(),
            tools: agent.tools.clone(),
            framing: PromptFraming::Step,
        }
    }

    /// Mark the instruction as coming from the supervisor's planner.
    pub fn delegated(mut self) -> Self {
        self.framing = PromptFraming::Delegated;
        self
    }

    /// User turn sent to the provider.
    pub fn user_prompt(&self) -> String {
        match self.framing {
            PromptFraming::Step if self.context.is_empty() => self.instruction.clone(),
            PromptFraming::Step => {
                format!("{}\n\nInput Context:\n{}", self.instruction, self.context)
            }
            PromptFraming::Delegated => format!(
                "Supervisor Instruction: {}\n\nContext:\n{}",
                self.instruction, self.context
            ),
        }
    }
}

#[async_trait]
pub trait ModelGateway: Send + Sync {
    async fn invoke(&self, request: &InvocationRequest) -> Result<String, ProviderError>;
}

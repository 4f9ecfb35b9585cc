//! HTTP gateway — calls provider APIs directly.
//!
//! Two wire dialects are spoken:
//!
//! - Anthropic Messages (`anthropic`): `POST {base}/v1/messages`
//! - OpenAI-compatible chat completions (`openai`, `groq`, `gemini`,
//!   `ollama`): `POST {base}/chat/completions`
//!
//! Base URLs and keys are read from `<PROVIDER>_BASE_URL` and
//! `<PROVIDER>_API_KEY` at call time unless overridden with
//! [`HttpGateway::with_endpoint`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use super::{InvocationRequest, ModelGateway, ProviderError};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    Anthropic,
    OpenAiChat,
}

struct ProviderProfile {
    dialect: Dialect,
    default_base_url: &'static str,
    key_required: bool,
}

fn profile(provider: &str) -> Option<ProviderProfile> {
    let (dialect, default_base_url, key_required) = match provider {
        "anthropic" => (Dialect::Anthropic, "https://api.anthropic.com", true),
        "openai" => (Dialect::OpenAiChat, "https://api.openai.com/v1", true),
        "groq" => (Dialect::OpenAiChat, "https://api.groq.com/openai/v1", true),
        "gemini" => (
            Dialect::OpenAiChat,
            "https://generativelanguage.googleapis.com/v1beta/openai",
            true,
        ),
        "ollama" => (Dialect::OpenAiChat, "http://localhost:11434/v1", false),
        _ => return None,
    };
    Some(ProviderProfile {
        dialect,
        default_base_url,
        key_required,
    })
}

#[derive(Debug, Clone)]
struct Endpoint {
    base_url: String,
    api_key: Option<String>,
}

/// Gateway that calls provider HTTP APIs.
#[derive(Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    overrides: HashMap<String, Endpoint>,
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpGateway {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            overrides: HashMap::new(),
        }
    }

    /// Pin a provider to an explicit base URL and key, bypassing the
    /// environment.
    pub fn with_endpoint(
        mut self,
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        self.overrides.insert(
            provider.into(),
            Endpoint {
                base_url: base_url.into(),
                api_key,
            },
        );
        self
    }

    fn endpoint(&self, provider: &str, profile: &ProviderProfile) -> Result<Endpoint, ProviderError> {
        if let Some(endpoint) = self.overrides.get(provider) {
            return Ok(endpoint.clone());
        }

        let prefix = provider.to_uppercase();
        let base_url = std::env::var(format!("{}_BASE_URL", prefix))
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| profile.default_base_url.to_string());
        let api_key = std::env::var(format!("{}_API_KEY", prefix))
            .ok()
            .filter(|v| !v.trim().is_empty());

        if profile.key_required && api_key.is_none() {
            return Err(ProviderError::Configuration(format!(
                "{}_API_KEY is not set",
                prefix
            )));
        }
        Ok(Endpoint { base_url, api_key })
    }

    async fn post(
        &self,
        provider: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<serde_json::Value, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                provider: provider.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Decode(e.to_string()))
    }

    async fn call_anthropic(
        &self,
        endpoint: &Endpoint,
        request: &InvocationRequest,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", endpoint.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": request.model.model,
            "max_tokens": MAX_TOKENS,
            "temperature": request.temperature,
            "messages": [{ "role": "user", "content": request.user_prompt() }]
        });
        if !request.persona.is_empty() {
            body["system"] = serde_json::Value::String(request.persona.clone());
        }

        tracing::debug!(
            "[HttpGateway] Calling Anthropic API: {} (model: {})",
            url,
            request.model.model
        );

        let mut builder = self
            .client
            .post(&url)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = &endpoint.api_key {
            builder = builder.header("x-api-key", key);
        }

        let json = self.post(&request.model.provider, builder).await?;
        extract_anthropic_text(&json)
    }

    async fn call_openai_chat(
        &self,
        endpoint: &Endpoint,
        request: &InvocationRequest,
    ) -> Result<String, ProviderError> {
        let url = format!(
            "{}/chat/completions",
            endpoint.base_url.trim_end_matches('/')
        );

        let mut messages = Vec::new();
        if !request.persona.is_empty() {
            messages.push(serde_json::json!({ "role": "system", "content": request.persona }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.user_prompt() }));

        let body = serde_json::json!({
            "model": request.model.model,
            "temperature": request.temperature,
            "messages": messages
        });

        tracing::debug!(
            "[HttpGateway] Calling {} chat completions: {} (model: {})",
            request.model.provider,
            url,
            request.model.model
        );

        let mut builder = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&body);
        if let Some(key) = &endpoint.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let json = self.post(&request.model.provider, builder).await?;
        extract_chat_text(&json)
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    async fn invoke(&self, request: &InvocationRequest) -> Result<String, ProviderError> {
        let provider = request.model.provider.as_str();
        let profile = profile(provider)
            .ok_or_else(|| ProviderError::UnsupportedProvider(provider.to_string()))?;
        let endpoint = self.endpoint(provider, &profile)?;

        match profile.dialect {
            Dialect::Anthropic => self.call_anthropic(&endpoint, request).await,
            Dialect::OpenAiChat => self.call_openai_chat(&endpoint, request).await,
        }
    }
}

/// Join the `text` blocks of an Anthropic Messages response.
fn extract_anthropic_text(json: &serde_json::Value) -> Result<String, ProviderError> {
    json.get("content")
        .and_then(|c| c.as_array())
        .and_then(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .map(str::to_string)
                .reduce(|a, b| format!("{}\n{}", a, b))
        })
        .ok_or_else(|| ProviderError::Decode("response has no text content".into()))
}

/// First choice's message content of a chat completions response.
fn extract_chat_text(json: &serde_json::Value) -> Result<String, ProviderError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| ProviderError::Decode("response has no message content".into()))
}

use async_trait::async_trait;

use super::{InvocationRequest, ModelGateway, ProviderError};

/// Deterministic offline gateway: answers with the instruction and a short
/// excerpt of the context, never touching the network.
///
/// The supervisor planner cannot parse echo output as a decision, so
/// supervisor runs against this gateway end with `planner_error`.
#[derive(Debug, Clone, Default)]
pub struct EchoGateway;

const EXCERPT_CHARS: usize = 200;

impl EchoGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelGateway for EchoGateway {
    async fn invoke(&self, request: &InvocationRequest) -> Result<String, ProviderError> {
        let mut out = format!("[{}] {}", request.model, request.instruction.trim());
        let context = request.context.trim();
        if !context.is_empty() {
            let excerpt: String = context.chars().take(EXCERPT_CHARS).collect();
            out.push_str("\n> ");
            out.push_str(&excerpt);
            if context.chars().count() > EXCERPT_CHARS {
                out.push('…');
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::agent::ModelRef;

    #[tokio::test]
    async fn test_echo_is_deterministic() {
        let request = InvocationRequest {
            persona: "reviewer".into(),
            model: ModelRef::new("openai", "gpt-4"),
            temperature: 0.0,
            instruction: "review".into(),
            context: "draft".into(),
            tools: Vec::new(),
            framing: Default::default(),
        };
        let a = EchoGateway.invoke(&request).await.unwrap();
        let b = EchoGateway.invoke(&request).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a, "[openai/gpt-4] review\n> draft");
    }
}

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

/// Request to send to an LLM provider
#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
    /// Ask the provider for structured output instead of free text
    pub response_format: Option<ResponseFormat>,
}

impl LlmRequest {
    /// Create a request with a user prompt and a system prompt
    pub fn new(prompt: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            system_prompt: Some(system_prompt.into()),
            ..Self::default()
        }
    }

    /// Require the response to match a JSON schema
    pub fn with_json_schema(mut self, name: &str, schema: Value) -> Self {
        self.response_format = Some(ResponseFormat::JsonSchema {
            name: name.to_string(),
            schema,
        });
        self
    }
}

/// Structured output constraint for a request
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// A JSON object conforming to `schema` (strict mode)
    JsonSchema { name: String, schema: Value },
}

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub content: String,
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl std::ops::AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Execute a completion request
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;

    /// Get the provider name for display
    fn name(&self) -> &'static str;

    /// Check if the provider is usable (API key set, endpoint valid, etc.)
    fn is_available(&self) -> Result<()>;
}

//! OpenAI-compatible API provider
//!
//! Used for any service that implements the OpenAI chat completions API:
//! - OpenAI
//! - OpenRouter, Cerebras, local gateways, and others

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::config::ServiceConfig;
use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse, ResponseFormat, TokenUsage};

/// Provider for OpenAI-compatible APIs
pub struct OpenAICompatibleProvider {
    model: String,
    base_url: String,
    api_key: String,
    timeout_secs: u64,
    client: Client,
}

impl OpenAICompatibleProvider {
    /// Create a new OpenAI-compatible provider
    pub fn new(model: &str, base_url: &str, api_key: String, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            model: model.to_string(),
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            api_key,
            timeout_secs,
            client,
        })
    }

    /// Create a provider from service settings
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.resolve_api_key()?;
        Self::new(
            &config.api_model,
            &config.api_endpoint,
            api_key,
            config.timeout_secs,
        )
    }

    fn build_chat_request(&self, request: &LlmRequest) -> ChatCompletionRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(Message {
                role: "system".to_string(),
                content: system.clone(),
            });
        }

        messages.push(Message {
            role: "user".to_string(),
            content: request.prompt.clone(),
        });

        ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            response_format: request.response_format.as_ref().map(WireResponseFormat::from),
        }
    }
}

// OpenAI API request/response types

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<WireResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireResponseFormat {
    JsonSchema { json_schema: JsonSchemaSpec },
}

#[derive(Debug, Serialize)]
struct JsonSchemaSpec {
    name: String,
    strict: bool,
    schema: Value,
}

impl From<&ResponseFormat> for WireResponseFormat {
    fn from(format: &ResponseFormat) -> Self {
        match format {
            ResponseFormat::JsonSchema { name, schema } => Self::JsonSchema {
                json_schema: JsonSchemaSpec {
                    name: name.clone(),
                    strict: true,
                    schema: schema.clone(),
                },
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

/// Map a non-success HTTP status to an error
fn error_from_status(status: u16, retry_after: Option<u64>, body: &str) -> LlmError {
    let message = match serde_json::from_str::<ErrorResponse>(body) {
        Ok(error_response) => error_response.error.message,
        Err(_) => body.to_string(),
    };

    match status {
        429 => LlmError::RateLimited { retry_after },
        // 503 is kept apart so callers can retry it
        503 => LlmError::ServerOverloaded { message },
        _ => LlmError::ApiError {
            message,
            status_code: Some(status),
        },
    }
}

/// Pull the reply text out of a completion response
fn extract_content(response: ChatCompletionResponse) -> Result<(String, Option<TokenUsage>)> {
    let usage = response.usage.map(|u| TokenUsage {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
    });

    let message = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| LlmError::ApiError {
            message: "Response contained no choices".into(),
            status_code: None,
        })?;

    if let Some(refusal) = message.refusal {
        return Err(LlmError::ApiError {
            message: format!("Model refused the request: {}", refusal),
            status_code: None,
        });
    }

    Ok((message.content.unwrap_or_default(), usage))
}

#[async_trait]
impl LlmProvider for OpenAICompatibleProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let chat_request = self.build_chat_request(&request);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            "POST {} (model: {}, prompt: {} chars)",
            url,
            self.model,
            request.prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&chat_request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        seconds: self.timeout_secs,
                    }
                } else {
                    LlmError::ApiError {
                        message: format!("Request failed: {}", e),
                        status_code: None,
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_from_status(status.as_u16(), retry_after, &error_text));
        }

        let chat_response: ChatCompletionResponse =
            response.json().await.map_err(|e| LlmError::ApiError {
                message: format!("Failed to parse response: {}", e),
                status_code: None,
            })?;

        let (content, usage) = extract_content(chat_response)?;

        Ok(LlmResponse {
            content,
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "OpenAI-compatible API"
    }

    fn is_available(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::ConfigError("API key is empty".into()));
        }
        Ok(())
    }
}

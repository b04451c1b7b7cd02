use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};

/// Default base URL of the OpenAI API
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";

/// Default model identifier
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Models offered by settings UIs; anything else is a custom model
pub const MODEL_SHORTLIST: &[&str] = &["gpt-4o-mini", "gpt-4o"];

/// Environment variable consulted when no API key is configured
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Connection parameters for an OpenAI-compatible service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// API key (optional, can use env var instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the chat completions API
    #[serde(default = "default_endpoint")]
    pub api_endpoint: String,

    /// Model name/identifier, passed through unchanged
    #[serde(default = "default_model")]
    pub api_model: String,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_endpoint: default_endpoint(),
            api_model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ServiceConfig {
    /// Resolve the API key from config first, then the environment
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.clone());
        }

        std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::MissingApiKey {
                provider: "OpenAI-compatible API".to_string(),
                env_var: API_KEY_ENV_VAR.to_string(),
            })
    }

    /// Check the endpoint looks like an HTTP(S) base URL
    pub fn validate(&self) -> Result<()> {
        let endpoint = self.api_endpoint.trim();
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(LlmError::ConfigError(format!(
                "API endpoint must be an http(s) URL: {}",
                self.api_endpoint
            )));
        }
        if self.api_model.trim().is_empty() {
            return Err(LlmError::ConfigError("Model name is empty".into()));
        }
        Ok(())
    }

    /// Whether the configured model is outside the UI shortlist
    pub fn is_custom_model(&self) -> bool {
        !MODEL_SHORTLIST.contains(&self.api_model.as_str())
    }
}

//! Shared LLM client library for the sanity-check workspace
//!
//! Provides a provider trait with two implementations:
//! - OpenAI-compatible chat completions API (OpenAI, OpenRouter, local gateways)
//! - Scripted mock provider for tests

pub mod config;
pub mod error;
pub mod provider;
pub mod providers;

pub use config::{DEFAULT_ENDPOINT, DEFAULT_MODEL, MODEL_SHORTLIST, ServiceConfig};
pub use error::{LlmError, Result};
pub use provider::{LlmProvider, LlmRequest, LlmResponse, ResponseFormat, TokenUsage};
pub use providers::{MockProvider, MockReply, OpenAICompatibleProvider, get_provider};

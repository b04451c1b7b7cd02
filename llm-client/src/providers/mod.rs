//! LLM provider implementations

pub mod mock;
mod openai_compatible;

pub use mock::{MockProvider, MockReply};
pub use openai_compatible::OpenAICompatibleProvider;

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::error::Result;
use crate::provider::LlmProvider;

/// Create a shareable provider instance from service settings
pub fn get_provider(config: &ServiceConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider = OpenAICompatibleProvider::from_config(config)?;
    provider.is_available()?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;

    #[test]
    fn test_get_provider_with_key() {
        let config = ServiceConfig {
            api_key: Some("sk-test".into()),
            ..ServiceConfig::default()
        };
        let provider = get_provider(&config).unwrap();
        assert_eq!(provider.name(), "OpenAI-compatible API");
    }

    #[test]
    fn test_get_provider_rejects_bad_endpoint() {
        let config = ServiceConfig {
            api_key: Some("sk-test".into()),
            api_endpoint: "localhost:8080".into(),
            ..ServiceConfig::default()
        };
        assert!(matches!(
            get_provider(&config),
            Err(LlmError::ConfigError(_))
        ));
    }
}

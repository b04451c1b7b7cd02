//! Mock LLM provider for testing
//!
//! Provides a configurable mock provider that can simulate various behaviors
//! like failures, retries, slow responses, and per-request scripted replies.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};

/// A scripted reply: wait `delay`, then return `outcome`
#[derive(Debug)]
pub struct MockReply {
    pub delay: Duration,
    pub outcome: Result<String>,
}

impl MockReply {
    /// Reply immediately with `content`
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(content.into()),
        }
    }

    /// Fail immediately with `error`
    pub fn err(error: LlmError) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(error),
        }
    }

    /// Delay the reply
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

type Handler = dyn Fn(&LlmRequest) -> MockReply + Send + Sync;

/// A mock provider for testing retry, fan-out and failure behavior
pub struct MockProvider {
    /// Number of times to fail before succeeding (0 = always succeed)
    fail_count: AtomicUsize,
    /// Current call count
    call_count: AtomicUsize,
    /// Error to return on failure (None = always succeed)
    fail_with: Mutex<Option<LlmError>>,
    /// Response content to return on success
    success_response: String,
    /// Per-request reply script, overrides the fields above when set
    handler: Option<Box<Handler>>,
    /// Every request received, in arrival order
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockProvider {
    fn base(fail_count: usize, fail_with: Option<LlmError>, response: &str) -> Self {
        Self {
            fail_count: AtomicUsize::new(fail_count),
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(fail_with),
            success_response: response.to_string(),
            handler: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider that fails `n` times with the given error, then succeeds
    pub fn fails_then_succeeds(n: usize, error: LlmError, response: &str) -> Self {
        Self::base(n, Some(error), response)
    }

    /// Create a provider that always fails with the given error
    pub fn always_fails(error: LlmError) -> Self {
        Self::base(usize::MAX, Some(error), "")
    }

    /// Create a provider that always succeeds
    pub fn always_succeeds(response: &str) -> Self {
        Self::base(0, None, response)
    }

    /// Create a provider that decides each reply from the request
    pub fn scripted<F>(handler: F) -> Self
    where
        F: Fn(&LlmRequest) -> MockReply + Send + Sync + 'static,
    {
        let mut provider = Self::base(0, None, "");
        provider.handler = Some(Box::new(handler));
        provider
    }

    /// Get the number of times complete() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Requests received so far, in arrival order
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn response(content: String) -> LlmResponse {
        LlmResponse {
            content,
            usage: Some(TokenUsage {
                input_tokens: 1,
                output_tokens: 1,
            }),
        }
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(handler) = &self.handler {
            let reply = handler(&request);
            if !reply.delay.is_zero() {
                tokio::time::sleep(reply.delay).await;
            }
            return reply.outcome.map(Self::response);
        }

        let fail_count = self.fail_count.load(Ordering::SeqCst);
        if call_num < fail_count {
            let error = self.fail_with.lock().unwrap();
            if let Some(err) = error.as_ref() {
                return Err(clone_error(err));
            }
        }

        Ok(Self::response(self.success_response.clone()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}

/// Clone an LlmError (needed because LlmError doesn't implement Clone)
fn clone_error(err: &LlmError) -> LlmError {
    match err {
        LlmError::ServerOverloaded { message } => LlmError::ServerOverloaded {
            message: message.clone(),
        },
        LlmError::MissingApiKey { provider, env_var } => LlmError::MissingApiKey {
            provider: provider.clone(),
            env_var: env_var.clone(),
        },
        LlmError::RateLimited { retry_after } => LlmError::RateLimited {
            retry_after: *retry_after,
        },
        LlmError::Timeout { seconds } => LlmError::Timeout { seconds: *seconds },
        LlmError::ApiError {
            message,
            status_code,
        } => LlmError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        LlmError::ConfigError(s) => LlmError::ConfigError(s.clone()),
    }
}

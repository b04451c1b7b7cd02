use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error(
        "API key not found for {provider}. Set {env_var} environment variable or add it to the settings file."
    )]
    MissingApiKey { provider: String, env_var: String },

    #[error("Rate limit exceeded{}", .retry_after.map(|s| format!(". Retry after {} seconds", s)).unwrap_or_default())]
    RateLimited { retry_after: Option<u64> },

    #[error("Server overloaded (HTTP 503): {message}")]
    ServerOverloaded { message: String },

    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("API error{}: {message}", status_code.map(|c| format!(" (HTTP {})", c)).unwrap_or_default())]
    ApiError {
        message: String,
        status_code: Option<u16>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether a retry of the same request may succeed.
    ///
    /// Network failures surface as `ApiError` without a status code and are
    /// treated as transient; an HTTP status other than 429/503 is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::ServerOverloaded { .. } | Self::Timeout { .. } => true,
            Self::ApiError { status_code, .. } => status_code.is_none(),
            Self::MissingApiKey { .. } | Self::ConfigError(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

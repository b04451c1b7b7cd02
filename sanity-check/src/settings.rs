//! sanity-check settings, persisted as TOML.
//!
//! The pipeline never reads or writes this file; the CLI loads it once and
//! hands the values to the pipeline.

use anyhow::{Context, Result, bail};
use llm_client::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use sanity_check::CheckOptions;
use sanity_check::edit::{DispatchOptions, FailurePolicy};
use sanity_check::text::DEFAULT_MAX_CHUNK_LENGTH;

const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;
const DEFAULT_MAX_RETRY_WAIT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// API key, endpoint, model and timeout
    #[serde(flatten)]
    pub service: ServiceConfig,

    /// Maximum chunk length in characters
    #[serde(default = "default_max_chunk_length")]
    pub max_chunk_length: usize,

    /// Extra attempts per chunk for transient errors
    #[serde(default)]
    pub max_retries: u32,

    /// Base wait between retries, multiplied by the attempt number
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Longest wait before a retry, including server-requested waits
    #[serde(default = "default_max_retry_wait_secs")]
    pub max_retry_wait_secs: u64,

    /// Stop every in-flight request as soon as one chunk fails
    #[serde(default = "default_fail_fast")]
    pub fail_fast: bool,

    /// Sampling temperature; the service default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

fn default_max_chunk_length() -> usize {
    DEFAULT_MAX_CHUNK_LENGTH
}

fn default_retry_backoff_ms() -> u64 {
    DEFAULT_RETRY_BACKOFF_MS
}

fn default_max_retry_wait_secs() -> u64 {
    DEFAULT_MAX_RETRY_WAIT_SECS
}

fn default_fail_fast() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service: ServiceConfig::default(),
            max_chunk_length: default_max_chunk_length(),
            max_retries: 0,
            retry_backoff_ms: default_retry_backoff_ms(),
            max_retry_wait_secs: default_max_retry_wait_secs(),
            fail_fast: default_fail_fast(),
            temperature: None,
        }
    }
}

impl Settings {
    /// Get the settings file path: ~/.config/cli-programs/sanity-check.toml
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Neither HOME nor USERPROFILE is set")?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("cli-programs")
            .join("sanity-check.toml"))
    }

    /// Load settings from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load settings from `path`, returning defaults if the file doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        Ok(settings)
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Reject values the pipeline can't run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_length == 0 {
            bail!("max_chunk_length must be greater than zero");
        }
        self.service.validate()?;
        Ok(())
    }

    /// Pipeline options derived from these settings.
    pub fn check_options(&self) -> CheckOptions {
        let policy = if self.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::CollectAll
        };

        CheckOptions {
            max_chunk_length: self.max_chunk_length,
            dispatch: DispatchOptions {
                policy,
                max_retries: self.max_retries,
                retry_backoff: Duration::from_millis(self.retry_backoff_ms),
                max_retry_wait: Duration::from_secs(self.max_retry_wait_secs),
            },
            temperature: self.temperature,
        }
    }
}

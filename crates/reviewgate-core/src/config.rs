//! Process configuration, built once at startup and threaded through constructors.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;
use thiserror::Error;

use crate::policy::ApprovalRule;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("classifier API key is empty")]
    MissingApiKey,
    #[error("scheduler concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("classifier timeout must be non-zero")]
    ZeroTimeout,
}

/// Connection settings for the LLM classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub api_key: String,
    pub model: String,
    /// Base URL without trailing slash, e.g. `https://generativelanguage.googleapis.com`.
    pub endpoint: String,
    /// Per-request timeout; an elapsed timeout is a classifier error.
    pub timeout: Duration,
}

impl ClassifierConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Daily re-ranking schedule.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time of day (UTC) at which the daily run fires.
    pub daily_at: NaiveTime,
    /// Businesses reranked at once; 1 means strictly sequential.
    pub concurrency: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_at: NaiveTime::MIN,
            concurrency: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    /// Shared secret expected in `x-webhook-secret` on review submission.
    pub webhook_secret: Option<String>,
    pub approval_rule: ApprovalRule,
    pub scheduler: SchedulerConfig,
    pub listen_addr: String,
    /// DuckDB file; `None` keeps reviews in memory.
    pub database: Option<PathBuf>,
}

impl AppConfig {
    pub fn new(classifier: ClassifierConfig) -> Self {
        Self {
            classifier,
            webhook_secret: None,
            approval_rule: ApprovalRule::default(),
            scheduler: SchedulerConfig::default(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            database: None,
        }
    }

    /// The configured webhook secret, treating an empty string as unset.
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.classifier.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.classifier.timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.scheduler.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }
}

//! Classifier backend configuration.

use std::time::Duration;

use thiserror::Error;

use crate::poll::PollConfig;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_LOCAL_MODEL_URL: &str = "http://localhost:8001";

/// Startup configuration errors. Any of these keeps the server from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY not set; required when CLASSIFIER_BACKEND=remote")]
    MissingApiKey,

    #[error("Unknown CLASSIFIER_BACKEND '{0}' (expected 'remote' or 'local')")]
    UnknownBackend(String),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Gemini file API configuration.
#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Timeout for each individual HTTP call
    pub request_timeout: Duration,
    pub poll: PollConfig,
}

impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("poll", &self.poll)
            .finish()
    }
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(300),
            poll: PollConfig::default(),
        }
    }
}

/// Local model service configuration.
#[derive(Debug, Clone)]
pub struct LocalModelConfig {
    /// Base URL of the co-located inference service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for LocalModelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LOCAL_MODEL_URL.to_string(),
            timeout: Duration::from_secs(300), // 5 minutes for video inference
        }
    }
}

/// Which backend classifies videos, with its settings.
#[derive(Debug, Clone)]
pub enum ClassifierConfig {
    Remote(GeminiConfig),
    Local(LocalModelConfig),
}

impl ClassifierConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secs = |key: &str, default: u64| {
            Duration::from_secs(var(key).and_then(|s| s.parse().ok()).unwrap_or(default))
        };

        let backend = var("CLASSIFIER_BACKEND").unwrap_or_else(|| "remote".to_string());
        match backend.trim().to_lowercase().as_str() {
            "remote" | "gemini" => {
                let api_key = var("GEMINI_API_KEY")
                    .filter(|k| !k.trim().is_empty())
                    .ok_or(ConfigError::MissingApiKey)?;
                let interval = secs("GEMINI_POLL_INTERVAL_SECS", 5);
                let deadline = secs("GEMINI_PROCESSING_TIMEOUT_SECS", 300);
                Ok(Self::Remote(GeminiConfig {
                    api_key,
                    model: var("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
                    base_url: var("GEMINI_BASE_URL")
                        .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
                    request_timeout: secs("GEMINI_REQUEST_TIMEOUT_SECS", 300),
                    poll: PollConfig::from_deadline(interval, deadline),
                }))
            }
            "local" => Ok(Self::Local(LocalModelConfig {
                base_url: var("LOCAL_MODEL_URL")
                    .unwrap_or_else(|| DEFAULT_LOCAL_MODEL_URL.to_string()),
                timeout: secs("LOCAL_MODEL_TIMEOUT_SECS", 300),
            })),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }

    /// Backend name for logging.
    pub fn backend_name(&self) -> &'static str {
        match self {
            ClassifierConfig::Remote(_) => "remote",
            ClassifierConfig::Local(_) => "local",
        }
    }
}

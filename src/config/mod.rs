//! Configuration management.
//!
//! This module handles:
//! - Environment variable loading
//! - Configuration validation
//! - Default value handling
//! - Secure API key storage via [`SecretString`]
//!
//! # Example
//!
//! ```
//! use graph_insights::config::{Config, SecretString};
//!
//! // Use Config::from_env() in production
//! let config = Config {
//!     api_key: Some(SecretString::new("local-example-key")),
//!     ..Config::default()
//! };
//!
//! println!("Using model: {}", config.model);
//! // API key is protected from accidental logging
//! let debug = format!("{:?}", config);
//! assert!(debug.contains("<REDACTED>"));
//! assert!(!debug.contains("local-example-key"));
//! ```

mod secret;
mod validation;

pub use secret::SecretString;
pub use validation::{
    validate_config, MAX_ATTEMPTS, MAX_TEMPERATURE, MAX_TIMEOUT_MS, MAX_TOKENS_LIMIT,
    MIN_TIMEOUT_MS,
};

use std::str::FromStr;

use crate::analysis::AnalysisConfig;
use crate::error::{CompletionError, ConfigError};
use crate::llm::{ClientConfig, LocalModelClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::prompts::DEFAULT_INSIGHT_CAP;
use crate::traits::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default request timeout in milliseconds.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = crate::llm::DEFAULT_TIMEOUT_MS;

/// Default traversal completion budget.
pub const DEFAULT_ATTEMPTS: usize = 8;

/// Application configuration.
///
/// Use [`Config::from_env`] to load configuration from environment variables.
/// The optional `api_key` uses [`SecretString`] to prevent accidental logging.
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct Config {
    /// Base URL of the OpenAI-compatible runtime.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Bearer key, for runtimes started with one.
    pub api_key: Option<SecretString>,
    /// Log level (error, warn, info, debug, trace).
    pub log_level: String,
    /// Request timeout in milliseconds, stream included.
    pub request_timeout_ms: u64,
    /// Maximum traversal completions per run.
    pub attempts: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Generation cap in tokens.
    pub max_tokens: u32,
    /// Accepted insights after which the run synthesizes.
    pub insight_cap: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            attempts: DEFAULT_ATTEMPTS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            insight_cap: DEFAULT_INSIGHT_CAP,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional (defaults in parentheses):
    /// - `LLM_BASE_URL`: runtime base URL (`http://127.0.0.1:8080/v1`)
    /// - `LLM_MODEL`: model identifier (`local-model`)
    /// - `LLM_API_KEY`: bearer key (none)
    /// - `LOG_LEVEL`: logging level (`info`)
    /// - `REQUEST_TIMEOUT_MS`: request timeout (`120000`)
    /// - `ANALYSIS_ATTEMPTS`: traversal completion budget (`8`)
    /// - `ANALYSIS_TEMPERATURE`: sampling temperature (`0.7`)
    /// - `ANALYSIS_MAX_TOKENS`: generation cap (`1000`)
    /// - `ANALYSIS_INSIGHT_CAP`: insights before synthesis (`3`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a numeric variable does not parse or any
    /// value fails validation (see [`validate_config`]).
    #[must_use = "configuration should be used"]
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();

        let base_url: String = std::env::var("LLM_BASE_URL")
            .map_or_else(|_| DEFAULT_BASE_URL.into(), |v| v.trim_end_matches('/').into());
        let model = std::env::var("LLM_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        let api_key = std::env::var("LLM_API_KEY")
            .ok()
            .and_then(|key| SecretString::non_blank(&key));
        let log_level = log_level_from_env();

        let config = Self {
            base_url,
            model,
            api_key,
            log_level,
            request_timeout_ms: parse_env("REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS)?,
            attempts: parse_env("ANALYSIS_ATTEMPTS", DEFAULT_ATTEMPTS)?,
            temperature: parse_env("ANALYSIS_TEMPERATURE", DEFAULT_TEMPERATURE)?,
            max_tokens: parse_env("ANALYSIS_MAX_TOKENS", DEFAULT_MAX_TOKENS)?,
            insight_cap: parse_env("ANALYSIS_INSIGHT_CAP", DEFAULT_INSIGHT_CAP)?,
        };

        validate_config(&config)?;
        Ok(config)
    }

    /// HTTP client settings derived from this configuration.
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_base_url(self.base_url.as_str())
            .with_model(self.model.as_str())
            .with_timeout_ms(self.request_timeout_ms)
    }

    /// Build a [`LocalModelClient`] from this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::Network`] if the HTTP client cannot be built.
    pub fn build_client(&self) -> Result<LocalModelClient, CompletionError> {
        let client = LocalModelClient::new(self.client_config())?;
        Ok(match &self.api_key {
            Some(key) => client.with_api_key(key.clone()),
            None => client,
        })
    }

    /// Analyzer settings derived from this configuration.
    #[must_use]
    pub fn analysis_config(&self) -> AnalysisConfig {
        AnalysisConfig::new()
            .with_attempts(self.attempts)
            .with_temperature(self.temperature)
            .with_max_tokens(self.max_tokens)
            .with_insight_cap(self.insight_cap)
    }
}

/// Load a `.env` file from the working directory or its parents, if any.
///
/// Variables already present in the environment take precedence.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::trace!(path = %path.display(), "Loaded .env");
    }
}

/// Logging filter from `LOG_LEVEL`, with `.env` applied first.
///
/// The binary calls this before installing the subscriber, so it cannot
/// wait for [`Config::from_env`].
#[must_use]
pub fn log_level_from_env() -> String {
    load_dotenv();
    std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into())
}

/// Parse an environment variable, using a default if not set.
fn parse_env<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: format!("'{val}' is not a valid number"),
        })
    })
}

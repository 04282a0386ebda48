//! Configuration validation.
//!
//! This module provides validation logic for configuration values,
//! ensuring they are within acceptable ranges.

use super::Config;
use crate::error::ConfigError;

/// Minimum allowed timeout in milliseconds (1 second).
pub const MIN_TIMEOUT_MS: u64 = 1000;

/// Maximum allowed timeout in milliseconds (10 minutes).
pub const MAX_TIMEOUT_MS: u64 = 600_000;

/// Maximum allowed traversal attempts.
pub const MAX_ATTEMPTS: usize = 64;

/// Maximum allowed sampling temperature.
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Maximum allowed generation cap in tokens.
pub const MAX_TOKENS_LIMIT: u32 = 32_768;

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if any value is out of range:
/// - `LLM_BASE_URL` must be an `http` or `https` URL
/// - `LLM_MODEL` must not be empty
/// - `REQUEST_TIMEOUT_MS` must be between 1000 and 600000
/// - `ANALYSIS_ATTEMPTS` must be between 1 and 64
/// - `ANALYSIS_TEMPERATURE` must be between 0.0 and 2.0
/// - `ANALYSIS_MAX_TOKENS` must be between 1 and 32768
/// - `ANALYSIS_INSIGHT_CAP` must be at least 1
#[must_use = "validation result should be checked"]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
        return Err(ConfigError::InvalidValue {
            var: "LLM_BASE_URL".into(),
            reason: "must start with http:// or https://".into(),
        });
    }

    if config.model.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            var: "LLM_MODEL".into(),
            reason: "must not be empty".into(),
        });
    }

    if config.request_timeout_ms < MIN_TIMEOUT_MS || config.request_timeout_ms > MAX_TIMEOUT_MS {
        return Err(ConfigError::InvalidValue {
            var: "REQUEST_TIMEOUT_MS".into(),
            reason: format!("must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS} ms"),
        });
    }

    if config.attempts == 0 || config.attempts > MAX_ATTEMPTS {
        return Err(ConfigError::InvalidValue {
            var: "ANALYSIS_ATTEMPTS".into(),
            reason: format!("must be between 1 and {MAX_ATTEMPTS}"),
        });
    }

    // NaN fails the range check
    if !(0.0..=MAX_TEMPERATURE).contains(&config.temperature) {
        return Err(ConfigError::InvalidValue {
            var: "ANALYSIS_TEMPERATURE".into(),
            reason: format!("must be between 0.0 and {MAX_TEMPERATURE}"),
        });
    }

    if config.max_tokens == 0 || config.max_tokens > MAX_TOKENS_LIMIT {
        return Err(ConfigError::InvalidValue {
            var: "ANALYSIS_MAX_TOKENS".into(),
            reason: format!("must be between 1 and {MAX_TOKENS_LIMIT}"),
        });
    }

    if config.insight_cap == 0 {
        return Err(ConfigError::InvalidValue {
            var: "ANALYSIS_INSIGHT_CAP".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &Config, expected_var: &str) {
        let result = validate_config(config);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { ref var, .. }) if var == expected_var),
            "expected {expected_var} to be rejected, got {result:?}"
        );
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_base_url_scheme() {
        let mut config = Config::default();
        config.base_url = "localhost:8080".into();
        assert_invalid(&config, "LLM_BASE_URL");

        config.base_url = "https://models.internal/v1".into();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_model() {
        let mut config = Config::default();
        config.model = "  ".into();
        assert_invalid(&config, "LLM_MODEL");
    }

    #[test]
    fn test_timeout_too_low() {
        let mut config = Config::default();
        config.request_timeout_ms = 999;
        assert_invalid(&config, "REQUEST_TIMEOUT_MS");
    }

    #[test]
    fn test_timeout_too_high() {
        let mut config = Config::default();
        config.request_timeout_ms = MAX_TIMEOUT_MS + 1;
        assert_invalid(&config, "REQUEST_TIMEOUT_MS");
    }

    #[test]
    fn test_boundary_timeouts() {
        let mut config = Config::default();
        config.request_timeout_ms = MIN_TIMEOUT_MS;
        assert!(validate_config(&config).is_ok());
        config.request_timeout_ms = MAX_TIMEOUT_MS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_attempts_bounds() {
        let mut config = Config::default();
        config.attempts = 0;
        assert_invalid(&config, "ANALYSIS_ATTEMPTS");
        config.attempts = MAX_ATTEMPTS + 1;
        assert_invalid(&config, "ANALYSIS_ATTEMPTS");
        config.attempts = MAX_ATTEMPTS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_temperature_bounds() {
        let mut config = Config::default();
        config.temperature = -0.1;
        assert_invalid(&config, "ANALYSIS_TEMPERATURE");
        config.temperature = 2.1;
        assert_invalid(&config, "ANALYSIS_TEMPERATURE");
        config.temperature = f32::NAN;
        assert_invalid(&config, "ANALYSIS_TEMPERATURE");
        config.temperature = 0.0;
        assert!(validate_config(&config).is_ok());
        config.temperature = MAX_TEMPERATURE;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_max_tokens_bounds() {
        let mut config = Config::default();
        config.max_tokens = 0;
        assert_invalid(&config, "ANALYSIS_MAX_TOKENS");
        config.max_tokens = MAX_TOKENS_LIMIT + 1;
        assert_invalid(&config, "ANALYSIS_MAX_TOKENS");
        config.max_tokens = MAX_TOKENS_LIMIT;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_insight_cap_zero() {
        let mut config = Config::default();
        config.insight_cap = 0;
        assert_invalid(&config, "ANALYSIS_INSIGHT_CAP");
    }
}

//! Error types for graph insight discovery.
//!
//! This module defines a hierarchical error system:
//! - [`AppError`]: Top-level application errors
//! - [`CompletionError`]: Language model completion errors
//! - [`AnalysisError`]: Analysis run errors
//! - [`GraphError`]: Graph loading and validation errors
//! - [`ConfigError`]: Configuration errors
//!
//! All errors implement `Send + Sync` for async compatibility.
//!
//! Malformed model output is deliberately absent from this hierarchy: the
//! response parser treats it as "no insight this round", never as an error.

use thiserror::Error;

/// Top-level application error.
///
/// This is the main error type returned by the binary entry point.
/// It wraps all subsystem errors for unified error handling.
#[derive(Debug, Error)]
pub enum AppError {
    /// Completion client error.
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// Analysis run error.
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    /// Graph data error.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Command line error.
    #[error("Command line error: {0}")]
    Cli(#[from] crate::cli::CliError),
}

/// Language model completion errors.
///
/// These errors represent failures when talking to the model runtime.
/// Every one of them aborts the analysis run that issued the request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// Authentication failed due to an invalid API key.
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    /// Request was rate limited.
    #[error("Rate limited: retry after {retry_after_seconds}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_seconds: u64,
    },

    /// The model is not loaded or the runtime is busy loading it.
    #[error("Model unavailable: {model}")]
    ModelUnavailable {
        /// The model that could not serve the request.
        model: String,
    },

    /// Request timed out.
    #[error("Request timeout after {timeout_ms}ms")]
    Timeout {
        /// Timeout duration in milliseconds.
        timeout_ms: u64,
    },

    /// Invalid request parameters.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Description of what's invalid.
        message: String,
    },

    /// Network communication error.
    #[error("Network error: {message}")]
    Network {
        /// Description of the network error.
        message: String,
    },

    /// Unexpected response from the runtime, including mid-stream errors.
    #[error("Unexpected response: {message}")]
    UnexpectedResponse {
        /// Description of what was unexpected.
        message: String,
    },
}

impl CompletionError {
    /// Returns true if this error is retryable.
    ///
    /// The analyzer never retries on its own; this is a hint for hosts
    /// deciding whether to offer the user a rerun of the whole analysis.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::ModelUnavailable { .. }
                | Self::Timeout { .. }
                | Self::Network { .. }
        )
    }
}

/// Analysis run errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A completion failed; the run was aborted without a partial result.
    #[error("Completion failed while {stage}: {source}")]
    Completion {
        /// What the analyzer was doing when the completion failed.
        stage: String,
        /// The underlying completion error.
        #[source]
        source: CompletionError,
    },

    /// The analysis configuration is unusable.
    #[error("Invalid analysis config: {field} {reason}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Why the value is invalid.
        reason: String,
    },
}

impl AnalysisError {
    /// Returns the underlying completion error, if any.
    #[must_use]
    pub const fn completion_error(&self) -> Option<&CompletionError> {
        match self {
            Self::Completion { source, .. } => Some(source),
            Self::InvalidConfig { .. } => None,
        }
    }
}

/// Graph data errors.
///
/// Raised while loading or validating host-supplied graph data, never during
/// an analysis run itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Reading a graph file failed.
    #[error("Failed to read {path}: {message}")]
    Io {
        /// The file path.
        path: String,
        /// Description of the I/O failure.
        message: String,
    },

    /// The graph JSON could not be decoded.
    #[error("Malformed graph data: {message}")]
    Malformed {
        /// Description of the decoding failure.
        message: String,
    },

    /// Two nodes share the same id.
    #[error("Duplicate node id: {id}")]
    DuplicateNodeId {
        /// The repeated id.
        id: String,
    },
}

/// Configuration errors.
///
/// These errors represent failures in configuration loading and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Required configuration is missing.
    #[error("Missing required: {var}")]
    MissingRequired {
        /// The missing variable name.
        var: String,
    },

    /// Configuration value is invalid.
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue {
        /// The variable name.
        var: String,
        /// Why the value is invalid.
        reason: String,
    },
}

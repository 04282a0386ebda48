//! Shared types for the traits module.

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Default generation cap in tokens.
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Sampling options for one completion request.
#[derive(Debug, Clone, Copy, PartialEq)]
// Cannot derive Eq: f32 temperature field does not implement Eq (IEEE 754 NaN != NaN)
#[allow(clippy::derive_partial_eq_without_eq)]
pub struct CompletionOptions {
    /// Temperature for sampling.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl CompletionOptions {
    /// Create options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set max tokens.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

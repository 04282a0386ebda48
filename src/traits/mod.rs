//! Trait definitions for mockable dependencies.
//!
//! This module defines:
//! - [`CompletionClient`]: the language model boundary
//!
//! It also re-exports [`CompletionOptions`] from the `types` submodule.
//!
//! # Mocking
//!
//! [`CompletionClient`] is annotated with `#[cfg_attr(test, mockall::automock)]`
//! which generates `MockCompletionClient` for unit tests.

mod types;

pub use types::{CompletionOptions, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CompletionError;

/// Text completion against a language model.
///
/// Implementations stream the generation internally and resolve with the
/// full text once the model stops. Callers issue one request at a time; an
/// implementation shared between runs must serialize generations itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for `prompt`.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError`] if the model is unavailable or the
    /// generation fails. Callers must not treat this as an empty completion.
    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError>;
}

#[async_trait]
impl<T> CompletionClient for Arc<T>
where
    T: CompletionClient + ?Sized,
{
    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        self.as_ref().complete(prompt, options).await
    }
}

#[async_trait]
impl<T> CompletionClient for &T
where
    T: CompletionClient + ?Sized,
{
    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        (**self).complete(prompt, options).await
    }
}

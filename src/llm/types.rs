//! Wire types for the OpenAI-compatible chat completions endpoint.
//!
//! Local runtimes (llama.cpp server, Ollama, vLLM, LM Studio) all accept this
//! request shape and stream `chat.completion.chunk` objects back as SSE.

use serde::{Deserialize, Serialize};

/// Chat role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System message.
    System,
    /// User message.
    User,
    /// Assistant message.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent the message.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Request body for `POST /chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Conversation; analysis prompts are a single user turn.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Generation cap in tokens.
    pub max_tokens: u32,
    /// Always true: the client consumes the SSE stream.
    pub stream: bool,
}

impl ChatRequest {
    /// Create a streaming request with a single user prompt.
    #[must_use]
    pub fn streaming(
        model: impl Into<String>,
        prompt: impl Into<String>,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            messages: vec![ChatMessage::user(prompt)],
            temperature,
            max_tokens,
            stream: true,
        }
    }
}

/// Parsed stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Generated text, possibly with the reason generation stopped.
    Delta {
        /// Text fragment; may be empty when only `finish_reason` is set.
        text: String,
        /// Why generation stopped, on the last chunk.
        finish_reason: Option<String>,
    },
    /// The `[DONE]` terminator.
    Done,
    /// The runtime reported an error mid-stream.
    Error {
        /// Error message from the runtime.
        message: String,
    },
    /// A chunk carrying nothing the client needs (role-only deltas, usage).
    Ignored,
}

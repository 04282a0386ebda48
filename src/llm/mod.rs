//! Local language model client.
//!
//! This module provides:
//! - [`LocalModelClient`]: streaming completions against an OpenAI-compatible
//!   runtime (llama.cpp server, Ollama, vLLM, LM Studio)
//! - SSE parsing and text accumulation
//!
//! # Architecture
//!
//! The client uses `reqwest` and consumes the SSE stream inline, so a
//! completion resolves only once the runtime sends `[DONE]` or closes the
//! stream. A per-client mutex keeps at most one generation in flight.
//!
//! # Example
//!
//! ```no_run
//! use graph_insights::llm::{ClientConfig, LocalModelClient};
//! use graph_insights::traits::{CompletionClient, CompletionOptions};
//!
//! # async fn run() -> Result<(), graph_insights::error::CompletionError> {
//! let client = LocalModelClient::new(ClientConfig::new().with_model("llama3"))?;
//! let text = client.complete("Say hello", CompletionOptions::new()).await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod streaming;
mod types;

pub use client::{LocalModelClient, TokenObserver, MAX_PROMPT_BYTES};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT_MS};
pub use streaming::{parse_sse_line, TokenAccumulator};
pub use types::{ChatMessage, ChatRequest, ChatRole, StreamEvent};

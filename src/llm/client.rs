//! HTTP client for a locally hosted model.
//!
//! This module provides:
//! - Streaming completions over an OpenAI-compatible endpoint
//! - Status code mapping onto [`CompletionError`]
//! - One in-flight generation per client
//!
//! Failed requests are never retried.

#![allow(clippy::missing_errors_doc)]

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;

use super::config::ClientConfig;
use super::streaming::{parse_sse_line, TokenAccumulator};
use super::types::ChatRequest;
use crate::config::SecretString;
use crate::error::CompletionError;
use crate::traits::{CompletionClient, CompletionOptions};

/// Maximum prompt size in bytes (400KB).
pub const MAX_PROMPT_BYTES: usize = 400_000;

/// Retry-after value used when a 429 carries no usable header.
const DEFAULT_RETRY_AFTER_SECONDS: u64 = 60;

/// Callback receiving each generated text fragment as it arrives.
pub type TokenObserver = Arc<dyn Fn(&str) + Send + Sync>;

/// Client for an OpenAI-compatible runtime such as llama.cpp server or Ollama.
pub struct LocalModelClient {
    client: Client,
    config: ClientConfig,
    api_key: Option<SecretString>,
    generation: Mutex<()>,
    on_token: Option<TokenObserver>,
}

impl fmt::Debug for LocalModelClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalModelClient")
            .field("config", &self.config)
            .field("api_key", &self.api_key)
            .field("on_token", &self.on_token.is_some())
            .finish_non_exhaustive()
    }
}

impl LocalModelClient {
    /// Create a new client.
    pub fn new(config: ClientConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| CompletionError::Network {
                message: format!("Failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            config,
            api_key: None,
            generation: Mutex::new(()),
            on_token: None,
        })
    }

    /// Send `key` as a bearer token. Empty keys are ignored.
    #[must_use]
    pub fn with_api_key(mut self, key: SecretString) -> Self {
        self.api_key = (!key.is_empty()).then_some(key);
        self
    }

    /// Observe generated text fragments as they stream in.
    #[must_use]
    pub fn with_token_observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_token = Some(Arc::new(observer));
        self
    }

    /// Get the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stream a completion and return the concatenated text.
    ///
    /// Concurrent calls on the same client wait for the running generation
    /// to finish first.
    pub async fn generate(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        Self::validate_prompt(prompt)?;

        let _generation = self.generation.lock().await;

        let request = ChatRequest::streaming(
            self.config.model.as_str(),
            prompt,
            options.temperature,
            options.max_tokens,
        );
        let url = self.config.completions_url();

        tracing::debug!(
            url = %url,
            model = %request.model,
            prompt_bytes = prompt.len(),
            max_tokens = request.max_tokens,
            temperature = request.temperature,
            "Starting streaming completion"
        );

        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        tracing::debug!(status = %status, "Received response headers");

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(CompletionError::AuthenticationFailed);
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(DEFAULT_RETRY_AFTER_SECONDS);
                return Err(CompletionError::RateLimited {
                    retry_after_seconds: retry_after,
                });
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                return Err(CompletionError::ModelUnavailable {
                    model: self.config.model.clone(),
                });
            }
            _ if !status.is_success() => {
                let body = response.text().await.unwrap_or_default();
                return Err(CompletionError::UnexpectedResponse {
                    message: format!("Status {status}: {body}"),
                });
            }
            _ => {}
        }

        let mut stream = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();
        let mut accumulator = TokenAccumulator::new();

        'stream: while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| self.transport_error(&e))?;
            pending.extend_from_slice(&bytes);

            // Lines are split on raw bytes so multi-byte characters may straddle chunks
            while let Some(newline) = pending.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = pending.drain(..=newline).collect();
                if self.process_line(&line, &mut accumulator)? {
                    break 'stream;
                }
            }
        }

        if !accumulator.is_done() && !pending.is_empty() {
            self.process_line(&pending, &mut accumulator)?;
        }

        tracing::debug!(
            fragments = accumulator.fragment_count(),
            bytes = accumulator.text().len(),
            finish_reason = ?accumulator.finish_reason(),
            terminated = accumulator.is_done(),
            "Completion stream finished"
        );

        Ok(accumulator.into_text())
    }

    /// Feed one raw SSE line to the accumulator. Returns true on `[DONE]`.
    fn process_line(
        &self,
        line: &[u8],
        accumulator: &mut TokenAccumulator,
    ) -> Result<bool, CompletionError> {
        let line = std::str::from_utf8(line).map_err(|e| CompletionError::UnexpectedResponse {
            message: format!("Invalid UTF-8 in stream: {e}"),
        })?;

        let Some(event) = parse_sse_line(line) else {
            return Ok(false);
        };

        if let Some(fragment) = accumulator.process(event?)? {
            if let Some(observer) = &self.on_token {
                observer(&fragment);
            }
        }
        Ok(accumulator.is_done())
    }

    fn transport_error(&self, error: &reqwest::Error) -> CompletionError {
        if error.is_timeout() {
            tracing::error!(timeout_ms = self.config.timeout_ms, "Completion timed out");
            CompletionError::Timeout {
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            tracing::error!(error = %error, "Completion transport failure");
            CompletionError::Network {
                message: error.to_string(),
            }
        }
    }

    fn validate_prompt(prompt: &str) -> Result<(), CompletionError> {
        if prompt.trim().is_empty() {
            return Err(CompletionError::InvalidRequest {
                message: "Prompt is empty".to_string(),
            });
        }
        if prompt.len() > MAX_PROMPT_BYTES {
            return Err(CompletionError::InvalidRequest {
                message: format!(
                    "Prompt is {} bytes, limit is {MAX_PROMPT_BYTES}",
                    prompt.len()
                ),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionClient for LocalModelClient {
    async fn complete(
        &self,
        prompt: &str,
        options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        self.generate(prompt, options).await
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unused_async
)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_client(server: &MockServer) -> LocalModelClient {
        let config = ClientConfig::new()
            .with_base_url(server.uri())
            .with_timeout_ms(5_000);
        LocalModelClient::new(config).unwrap()
    }

    fn chunk(text: &str) -> String {
        let payload = serde_json::json!({
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": text}, "finish_reason": null}]
        });
        format!("data: {payload}\n\n")
    }

    fn sse_body(fragments: &[&str]) -> String {
        let mut body = String::from(
            "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"}}]}\n\n",
        );
        for fragment in fragments {
            body.push_str(&chunk(fragment));
        }
        body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
        body.push_str("data: [DONE]\n\n");
        body
    }

    async fn mount_sse(server: &MockServer, body: String) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_generate_concatenates_stream() {
        let server = MockServer::start().await;
        mount_sse(&server, sse_body(&["INSIGHT: A", " link\n", "CONFIDENCE: 80"])).await;

        let client = create_client(&server);
        let text = client
            .complete("prompt", CompletionOptions::new())
            .await
            .unwrap();
        assert_eq!(text, "INSIGHT: A link\nCONFIDENCE: 80");
    }

    #[tokio::test]
    async fn test_generate_sends_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "model": "local-model",
                "max_tokens": 250,
                "stream": true,
                "messages": [{"role": "user", "content": "the prompt"}]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(sse_body(&["ok"]), "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client(&server);
        let text = client
            .complete("the prompt", CompletionOptions::new().with_max_tokens(250))
            .await
            .unwrap();
        assert_eq!(text, "ok");
    }

    #[tokio::test]
    async fn test_generate_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer local-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(sse_body(&["ok"]), "text/event-stream"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client(&server).with_api_key(SecretString::new("local-key"));
        assert_eq!(
            client.complete("p", CompletionOptions::new()).await.unwrap(),
            "ok"
        );
    }

    #[tokio::test]
    async fn test_generate_without_done_terminator() {
        let server = MockServer::start().await;
        let body = format!("{}{}", chunk("partial "), chunk("text"));
        mount_sse(&server, body).await;

        let client = create_client(&server);
        let text = client.complete("p", CompletionOptions::new()).await.unwrap();
        assert_eq!(text, "partial text");
    }

    #[tokio::test]
    async fn test_generate_trailing_line_without_newline() {
        let server = MockServer::start().await;
        let payload = serde_json::json!({"choices": [{"delta": {"content": "tail"}}]});
        mount_sse(&server, format!("{}data: {payload}", chunk("head "))).await;

        let client = create_client(&server);
        let text = client.complete("p", CompletionOptions::new()).await.unwrap();
        assert_eq!(text, "head tail");
    }

    #[tokio::test]
    async fn test_generate_ignores_lines_after_done() {
        let server = MockServer::start().await;
        let body = format!("{}data: [DONE]\n\n{}", chunk("kept"), chunk("dropped"));
        mount_sse(&server, body).await;

        let client = create_client(&server);
        let text = client.complete("p", CompletionOptions::new()).await.unwrap();
        assert_eq!(text, "kept");
    }

    #[tokio::test]
    async fn test_generate_multibyte_text() {
        let server = MockServer::start().await;
        mount_sse(&server, sse_body(&["Zürich ", "→ Köln"])).await;

        let client = create_client(&server);
        let text = client.complete("p", CompletionOptions::new()).await.unwrap();
        assert_eq!(text, "Zürich → Köln");
    }

    #[tokio::test]
    async fn test_token_observer_sees_fragments() {
        let server = MockServer::start().await;
        mount_sse(&server, sse_body(&["a", "b", "c"])).await;

        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let client = create_client(&server)
            .with_token_observer(move |fragment| sink.lock().unwrap().push(fragment.to_string()));

        client.complete("p", CompletionOptions::new()).await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_generate_stream_error_event() {
        let server = MockServer::start().await;
        let body = format!(
            "{}data: {{\"error\":{{\"message\":\"out of memory\"}}}}\n\n",
            chunk("partial")
        );
        mount_sse(&server, body).await;

        let client = create_client(&server);
        let err = client
            .complete("p", CompletionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CompletionError::UnexpectedResponse {
                message: "out of memory".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_generate_malformed_chunk() {
        let server = MockServer::start().await;
        mount_sse(&server, "data: {oops\n\n".to_string()).await;

        let client = create_client(&server);
        let err = client
            .complete("p", CompletionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::UnexpectedResponse { .. }));
    }

    #[tokio::test]
    async fn test_generate_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = create_client(&server);
        let err = client
            .complete("p", CompletionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err, CompletionError::AuthenticationFailed);
    }

    #[tokio::test]
    async fn test_generate_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).append_header("retry-after", "30"))
            .mount(&server)
            .await;

        let client = create_client(&server);
        match client.complete("p", CompletionOptions::new()).await {
            Err(CompletionError::RateLimited {
                retry_after_seconds,
            }) => assert_eq!(retry_after_seconds, 30),
            other => panic!("Wrong result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_rate_limited_default_retry_after() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = create_client(&server);
        let err = client
            .complete("p", CompletionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CompletionError::RateLimited {
                retry_after_seconds: 60
            }
        );
    }

    #[tokio::test]
    async fn test_generate_model_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Loading model"))
            .mount(&server)
            .await;

        let client = create_client(&server);
        let err = client
            .complete("p", CompletionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            CompletionError::ModelUnavailable {
                model: "local-model".to_string()
            }
        );
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_generate_unexpected_status_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let client = create_client(&server);
        match client.complete("p", CompletionOptions::new()).await {
            Err(CompletionError::UnexpectedResponse { message }) => {
                assert!(message.contains("500"));
                assert!(message.contains("boom"));
            }
            other => panic!("Wrong result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["late"]), "text/event-stream")
                    .set_delay(Duration::from_millis(1_000)),
            )
            .mount(&server)
            .await;

        let config = ClientConfig::new()
            .with_base_url(server.uri())
            .with_timeout_ms(100);
        let client = LocalModelClient::new(config).unwrap();
        let err = client
            .complete("p", CompletionOptions::new())
            .await
            .unwrap_err();
        assert_eq!(err, CompletionError::Timeout { timeout_ms: 100 });
    }

    #[tokio::test]
    async fn test_generate_connection_refused() {
        let config = ClientConfig::new()
            .with_base_url("http://127.0.0.1:1")
            .with_timeout_ms(2_000);
        let client = LocalModelClient::new(config).unwrap();
        let err = client
            .complete("p", CompletionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Network { .. }));
    }

    #[tokio::test]
    async fn test_concurrent_generations_both_complete() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(&["ok"]), "text/event-stream")
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let client = create_client(&server);
        let (a, b) = tokio::join!(
            client.complete("first", CompletionOptions::new()),
            client.complete("second", CompletionOptions::new())
        );
        assert_eq!(a.unwrap(), "ok");
        assert_eq!(b.unwrap(), "ok");
    }

    #[test]
    fn test_validate_prompt_empty() {
        let err = LocalModelClient::validate_prompt("  \n").unwrap_err();
        assert!(matches!(err, CompletionError::InvalidRequest { .. }));
    }

    #[test]
    fn test_validate_prompt_too_large() {
        let prompt = "x".repeat(MAX_PROMPT_BYTES + 1);
        let err = LocalModelClient::validate_prompt(&prompt).unwrap_err();
        assert!(matches!(err, CompletionError::InvalidRequest { .. }));
        assert!(LocalModelClient::validate_prompt("x").is_ok());
    }

    #[test]
    fn test_client_debug_redacts_key() {
        let client = LocalModelClient::new(ClientConfig::new())
            .unwrap()
            .with_api_key(SecretString::new("super-secret"));
        let debug = format!("{client:?}");
        assert!(debug.contains("LocalModelClient"));
        assert!(debug.contains("<REDACTED>"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_empty_api_key_ignored() {
        let client = LocalModelClient::new(ClientConfig::new())
            .unwrap()
            .with_api_key(SecretString::new(""));
        assert!(client.api_key.is_none());
    }
}

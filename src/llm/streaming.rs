//! Streaming support for OpenAI-compatible runtimes.
//!
//! This module provides:
//! - Server-Sent Events (SSE) line parsing
//! - Accumulator for building the complete completion text

#![allow(clippy::missing_const_for_fn)]

use serde::Deserialize;

use super::types::StreamEvent;
use crate::error::CompletionError;

/// Parse a Server-Sent Event line into a `StreamEvent`.
///
/// Returns `None` for blank lines, comments and non-data fields.
#[must_use]
pub fn parse_sse_line(line: &str) -> Option<Result<StreamEvent, CompletionError>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    // Some runtimes omit the space after the colon
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(Ok(StreamEvent::Done));
    }
    Some(parse_event_data(data))
}

fn parse_event_data(data: &str) -> Result<StreamEvent, CompletionError> {
    let chunk: RawChunk =
        serde_json::from_str(data).map_err(|e| CompletionError::UnexpectedResponse {
            message: format!("Failed to parse stream chunk: {e}"),
        })?;

    if let Some(error) = chunk.error {
        return Ok(StreamEvent::Error {
            message: error.message,
        });
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(StreamEvent::Ignored);
    };

    let text = choice.delta.and_then(|d| d.content).unwrap_or_default();
    if text.is_empty() && choice.finish_reason.is_none() {
        return Ok(StreamEvent::Ignored);
    }

    Ok(StreamEvent::Delta {
        text,
        finish_reason: choice.finish_reason,
    })
}

#[derive(Debug, Deserialize)]
struct RawChunk {
    #[serde(default)]
    choices: Vec<RawChoice>,
    #[serde(default)]
    error: Option<RawError>,
}

#[derive(Debug, Deserialize)]
struct RawChoice {
    #[serde(default)]
    delta: Option<RawDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    message: String,
}

/// Accumulator for building a completion from stream events.
#[derive(Debug, Default)]
pub struct TokenAccumulator {
    text: String,
    fragments: usize,
    finish_reason: Option<String>,
    done: bool,
}

impl TokenAccumulator {
    /// Create a new accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a stream event.
    ///
    /// Returns the text fragment the event added, if any.
    ///
    /// # Errors
    ///
    /// Returns [`CompletionError::UnexpectedResponse`] for an in-stream error event.
    pub fn process(&mut self, event: StreamEvent) -> Result<Option<String>, CompletionError> {
        match event {
            StreamEvent::Delta {
                text,
                finish_reason,
            } => {
                if finish_reason.is_some() {
                    self.finish_reason = finish_reason;
                }
                if text.is_empty() {
                    return Ok(None);
                }
                self.text.push_str(&text);
                self.fragments += 1;
                Ok(Some(text))
            }
            StreamEvent::Done => {
                self.done = true;
                Ok(None)
            }
            StreamEvent::Error { message } => {
                Err(CompletionError::UnexpectedResponse { message })
            }
            StreamEvent::Ignored => Ok(None),
        }
    }

    /// Text accumulated so far.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of non-empty fragments received.
    #[must_use]
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }

    /// Why the runtime stopped generating, if it said.
    #[must_use]
    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    /// True once `[DONE]` has been seen.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Consume the accumulator, returning the full text.
    #[must_use]
    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn delta(text: &str) -> StreamEvent {
        StreamEvent::Delta {
            text: text.to_string(),
            finish_reason: None,
        }
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "whitespace")]
    #[test_case(": keep-alive" ; "comment")]
    #[test_case("event: message" ; "event field")]
    #[test_case("id: 7" ; "id field")]
    fn test_parse_sse_line_skipped(line: &str) {
        assert!(parse_sse_line(line).is_none());
    }

    #[test]
    fn test_parse_sse_line_done() {
        assert_eq!(parse_sse_line("data: [DONE]").unwrap(), Ok(StreamEvent::Done));
    }

    #[test]
    fn test_parse_sse_line_delta() {
        let line = r#"data: {"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), Ok(delta("Hel")));
    }

    #[test]
    fn test_parse_sse_line_without_space() {
        let line = r#"data:{"choices":[{"delta":{"content":"x"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), Ok(delta("x")));
    }

    #[test]
    fn test_parse_sse_line_role_only_is_ignored() {
        let line = r#"data: {"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), Ok(StreamEvent::Ignored));
    }

    #[test]
    fn test_parse_sse_line_usage_only_is_ignored() {
        let line = r#"data: {"choices":[],"usage":{"prompt_tokens":5,"completion_tokens":9}}"#;
        assert_eq!(parse_sse_line(line).unwrap(), Ok(StreamEvent::Ignored));
    }

    #[test]
    fn test_parse_sse_line_finish_reason() {
        let line = r#"data: {"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            Ok(StreamEvent::Delta {
                text: String::new(),
                finish_reason: Some("stop".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_sse_line_error_event() {
        let line = r#"data: {"error":{"message":"context length exceeded","type":"invalid_request_error"}}"#;
        assert_eq!(
            parse_sse_line(line).unwrap(),
            Ok(StreamEvent::Error {
                message: "context length exceeded".to_string()
            })
        );
    }

    #[test]
    fn test_parse_sse_line_invalid_json() {
        let result = parse_sse_line("data: {not json").unwrap();
        match result {
            Err(CompletionError::UnexpectedResponse { message }) => {
                assert!(message.contains("Failed to parse stream chunk"));
            }
            other => panic!("Wrong result: {other:?}"),
        }
    }

    #[test]
    fn test_accumulator_concatenates_in_order() {
        let mut acc = TokenAccumulator::new();
        assert_eq!(acc.process(delta("INSIGHT:")).unwrap().as_deref(), Some("INSIGHT:"));
        acc.process(delta(" A\n")).unwrap();
        acc.process(StreamEvent::Ignored).unwrap();
        acc.process(StreamEvent::Delta {
            text: String::new(),
            finish_reason: Some("length".to_string()),
        })
        .unwrap();
        acc.process(StreamEvent::Done).unwrap();

        assert_eq!(acc.text(), "INSIGHT: A\n");
        assert_eq!(acc.fragment_count(), 2);
        assert_eq!(acc.finish_reason(), Some("length"));
        assert!(acc.is_done());
        assert_eq!(acc.into_text(), "INSIGHT: A\n");
    }

    #[test]
    fn test_accumulator_error_event() {
        let mut acc = TokenAccumulator::new();
        acc.process(delta("partial")).unwrap();
        let err = acc
            .process(StreamEvent::Error {
                message: "model crashed".to_string(),
            })
            .unwrap_err();
        assert_eq!(
            err,
            CompletionError::UnexpectedResponse {
                message: "model crashed".to_string()
            }
        );
    }

    #[test]
    fn test_accumulator_empty() {
        let acc = TokenAccumulator::new();
        assert_eq!(acc.text(), "");
        assert!(!acc.is_done());
        assert_eq!(acc.finish_reason(), None);
    }
}

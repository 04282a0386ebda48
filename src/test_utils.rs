//! Test utilities and mock factories.
//!
//! This module provides shared testing infrastructure:
//! - Mock completion clients
//! - A scripted client that replays canned completions
//! - Graph and progress fixtures
//!
//! Only compiled for tests (`#[cfg(test)]`).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::analysis::{AnalysisConfig, ProgressEvent};
use crate::error::CompletionError;
use crate::graph::{Edge, GraphData, Node, NodeType};
use crate::insight::GraphInsight;
use crate::parsing::{render_response, NextDirective};
use crate::traits::{CompletionClient, CompletionOptions, MockCompletionClient};

/// Create a mock client that always returns `response`.
#[must_use]
pub fn mock_completion_success(response: impl Into<String>) -> MockCompletionClient {
    let response = response.into();
    let mut mock = MockCompletionClient::new();
    mock.expect_complete()
        .returning(move |_prompt, _options| Ok(response.clone()));
    mock
}

/// Create a mock client that always fails with `error`.
#[must_use]
pub fn mock_completion_error(error: CompletionError) -> MockCompletionClient {
    let mut mock = MockCompletionClient::new();
    mock.expect_complete()
        .returning(move |_prompt, _options| Err(error.clone()));
    mock
}

/// Render a well-formed completion.
///
/// `nodes` is written verbatim; `next` may be a node id, `SYNTHESIZE`,
/// `DONE` or empty.
#[must_use]
pub fn completion(description: &str, confidence: u8, nodes: &str, next: &str) -> String {
    format!(
        "INSIGHT: {description}\nREASONING: 1. Observed in the graph\n2. Follows from the edges\nCONFIDENCE: {confidence}\nNODES: {nodes}\nNEXT_NODE: {next}"
    )
}

/// Render a completion from typed parts.
#[must_use]
pub fn completion_for(insight: &GraphInsight, next: &NextDirective) -> String {
    render_response(insight, next)
}

/// Alice and Bob both working for Acme.
#[must_use]
pub fn sample_graph() -> GraphData {
    GraphData::new(
        vec![
            Node::new("a", "Alice", NodeType::Person).with_description("Engineer"),
            Node::new("b", "Bob", NodeType::Person),
            Node::new("acme", "Acme", NodeType::Organization),
        ],
        vec![
            Edge::new("a", "acme", "works_for"),
            Edge::new("b", "acme", "works_for"),
        ],
    )
}

/// Shared log of delivered progress events.
pub type EventLog = Arc<Mutex<Vec<ProgressEvent>>>;

/// Default analysis config whose progress events are recorded.
#[must_use]
pub fn recording_config() -> (AnalysisConfig, EventLog) {
    let events: EventLog = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let config = AnalysisConfig::new().with_on_log(move |e| sink.lock().unwrap().push(e.clone()));
    (config, events)
}

/// Completion client replaying a fixed script.
///
/// Each call pops the next scripted result. Once the script is exhausted
/// every call returns the fallback text. Prompts are recorded.
#[derive(Debug, Default)]
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, CompletionError>>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    /// Script successful completions.
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(responses.into_iter().map(|r| Ok(r.into())))
    }

    /// Script completions and failures.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Result<String, CompletionError>>,
    {
        Self {
            script: Mutex::new(results.into_iter().collect()),
            fallback: String::new(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Text returned after the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = fallback.into();
        self
    }

    /// Number of completions requested.
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    /// Prompts received, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(
        &self,
        prompt: &str,
        _options: CompletionOptions,
    ) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_response;

    #[tokio::test]
    async fn test_mock_completion_success() {
        let mock = mock_completion_success("hello");
        let result = mock.complete("p", CompletionOptions::new()).await;
        assert_eq!(result.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_mock_completion_error() {
        let mock = mock_completion_error(CompletionError::AuthenticationFailed);
        let result = mock.complete("p", CompletionOptions::new()).await;
        assert_eq!(result, Err(CompletionError::AuthenticationFailed));
    }

    #[tokio::test]
    async fn test_scripted_client_replays_then_falls_back() {
        let client = ScriptedClient::from_results([
            Ok("one".to_string()),
            Err(CompletionError::AuthenticationFailed),
        ])
        .with_fallback("rest");

        let options = CompletionOptions::new();
        assert_eq!(client.complete("p1", options).await.unwrap(), "one");
        assert!(client.complete("p2", options).await.is_err());
        assert_eq!(client.complete("p3", options).await.unwrap(), "rest");
        assert_eq!(client.calls(), 3);
        assert_eq!(client.prompts(), vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_completion_helper_parses() {
        let parsed = parse_response(&completion("Finding", 88, "a, b", "SYNTHESIZE"));
        let insight = parsed.insight.unwrap();
        assert_eq!(insight.description, "Finding");
        assert_eq!(insight.confidence, 88);
        assert_eq!(insight.related_nodes, vec!["a", "b"]);
        assert_eq!(parsed.next, Some(NextDirective::Synthesize));
    }

    #[test]
    fn test_completion_for_matches_parser() {
        let insight = GraphInsight::new("Typed", vec!["1. step".into()], 75, vec!["a".into()]);
        let parsed = parse_response(&completion_for(&insight, &NextDirective::Done));
        assert_eq!(parsed.insight, Some(insight));
    }

    #[test]
    fn test_sample_graph_is_valid() {
        let graph = sample_graph();
        assert!(graph.validate().is_ok());
        assert_eq!(graph.nodes[0].id, "a");
    }
}

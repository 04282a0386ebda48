//! Graph analysis orchestration.
//!
//! [`GraphAnalyzer`] walks a graph node by node, asks the model for one
//! insight per stop, follows the model's choice of next node when it names
//! an unvisited node, and optionally finishes with a synthesis pass.
//!
//! # Flow
//!
//! ```text
//! format graph once
//!   └─▶ pick node ─▶ prompt ─▶ complete ─▶ parse ─▶ gate (confidence > 70)
//!          ▲                                          │
//!          ├──────────── NEXT_NODE: <id> ◀────────────┤
//!          └──── first unvisited ◀── DONE / none ◀────┤
//!                                                     ├─ SYNTHESIZE / cap ─▶ synthesis ─┐
//!                                                     └─ budget / exhausted ────────────┤
//!                                                                                       ▼
//!                                                                  deduplicate ─▶ insights
//! ```
//!
//! A run issues at most `min(node count, attempts)` traversal completions
//! plus one synthesis completion.

mod progress;
mod state;

pub use progress::{
    create_progress_channel, ProgressCallback, ProgressEvent, ProgressReporter, ProgressSink,
    MSG_BEGIN, MSG_COMPLETE, MSG_SYNTHESIS_GENERATED, MSG_SYNTHESIZING,
};
pub use state::{Phase, TraversalState};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_ATTEMPTS;
use crate::error::AnalysisError;
use crate::graph::GraphData;
use crate::insight::{deduplicate, GraphInsight, MAX_CONFIDENCE};
use crate::parsing::{parse_response, NextDirective};
use crate::prompts::{PromptBuilder, DEFAULT_INSIGHT_CAP};
use crate::traits::{CompletionClient, CompletionOptions, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

/// Traversal insights must score strictly above this to be kept.
pub const DEFAULT_ACCEPTANCE_THRESHOLD: u8 = 70;

/// Settings for one analyzer.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum traversal completions per run.
    pub attempts: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Generation cap in tokens.
    pub max_tokens: u32,
    /// Accepted insights after which the run synthesizes.
    pub insight_cap: usize,
    /// Traversal insights need a confidence strictly greater than this.
    pub acceptance_threshold: u8,
    /// Receives progress notifications.
    pub on_log: Option<ProgressSink>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            insight_cap: DEFAULT_INSIGHT_CAP,
            acceptance_threshold: DEFAULT_ACCEPTANCE_THRESHOLD,
            on_log: None,
        }
    }
}

impl AnalysisConfig {
    /// Create a config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the traversal completion budget.
    #[must_use]
    pub const fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
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

    /// Set the insight count that triggers synthesis.
    #[must_use]
    pub const fn with_insight_cap(mut self, insight_cap: usize) -> Self {
        self.insight_cap = insight_cap;
        self
    }

    /// Set the confidence gate.
    #[must_use]
    pub const fn with_acceptance_threshold(mut self, threshold: u8) -> Self {
        self.acceptance_threshold = threshold;
        self
    }

    /// Send progress notifications to `sink`.
    #[must_use]
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.on_log = Some(sink);
        self
    }

    /// Send progress notifications to a closure.
    #[must_use]
    pub fn with_on_log<F>(self, f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.with_progress(ProgressSink::callback(f))
    }

    /// Sampling options for every completion of a run.
    #[must_use]
    pub const fn completion_options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    /// Check the values are usable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |field: &str, reason: &str| {
            Err(AnalysisError::InvalidConfig {
                field: field.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.attempts == 0 {
            return invalid("attempts", "must be at least 1");
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return invalid("temperature", "must be a non-negative number");
        }
        if self.max_tokens == 0 {
            return invalid("max_tokens", "must be at least 1");
        }
        if self.insight_cap == 0 {
            return invalid("insight_cap", "must be at least 1");
        }
        if self.acceptance_threshold >= MAX_CONFIDENCE {
            return invalid("acceptance_threshold", "must be below 100");
        }
        Ok(())
    }
}

/// Result of a run together with its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Identifies the run; matches [`ProgressEvent::run_id`].
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Completions issued, synthesis included.
    pub completion_calls: usize,
    /// Distinct nodes analyzed.
    pub nodes_visited: usize,
    /// What the graph was framed as in the prompts.
    pub domain: String,
    /// Deduplicated insights in acceptance order.
    pub insights: Vec<GraphInsight>,
}

/// Walks a graph with a language model and collects insights.
///
/// Each call to [`analyze`](Self::analyze) is an independent run with its
/// own visited set and insight list, so one analyzer can serve many runs.
#[derive(Debug)]
pub struct GraphAnalyzer<C> {
    client: C,
    config: AnalysisConfig,
    prompts: PromptBuilder,
}

impl<C: CompletionClient> GraphAnalyzer<C> {
    /// Create an analyzer with the default prompt framing.
    #[must_use]
    pub fn new(client: C, config: AnalysisConfig) -> Self {
        let prompts = PromptBuilder::new().with_insight_cap(config.insight_cap);
        Self {
            client,
            config,
            prompts,
        }
    }

    /// Use a custom prompt builder. Its insight cap is aligned with the config.
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts.with_insight_cap(self.config.insight_cap);
        self
    }

    /// Get the analysis config.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Get the completion client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Analyze the whole graph.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::InvalidConfig`] before any completion if the
    /// config is unusable, or [`AnalysisError::Completion`] if any completion
    /// fails. A failed run yields no partial result.
    pub async fn analyze(&self, graph: &GraphData) -> Result<Vec<GraphInsight>, AnalysisError> {
        Ok(self.analyze_report(graph).await?.insights)
    }

    /// Analyze the selected nodes and their direct neighbours.
    ///
    /// Only edges with both endpoints inside that section are shown to the
    /// model. An empty selection gives an empty result.
    ///
    /// # Errors
    ///
    /// Same as [`analyze`](Self::analyze).
    pub async fn analyze_section(
        &self,
        graph: &GraphData,
        selected_ids: &[String],
    ) -> Result<Vec<GraphInsight>, AnalysisError> {
        let section = graph.section(selected_ids);
        tracing::debug!(
            selected = selected_ids.len(),
            section_nodes = section.nodes.len(),
            section_edges = section.edges.len(),
            "Analyzing graph section"
        );
        self.analyze(&section).await
    }

    /// Analyze the whole graph and return run metadata with the insights.
    ///
    /// # Errors
    ///
    /// Same as [`analyze`](Self::analyze).
    pub async fn analyze_report(&self, graph: &GraphData) -> Result<AnalysisReport, AnalysisError> {
        self.config.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let reporter = ProgressReporter::new(run_id.to_string(), self.config.on_log.clone());
        tracing::info!(
            run_id = %run_id,
            domain = self.prompts.domain(),
            nodes = graph.nodes.len(),
            "Starting graph analysis"
        );

        let state = self.run(graph, &reporter).await.inspect_err(|e| {
            tracing::error!(run_id = %run_id, error = %e, "Graph analysis aborted");
        })?;

        let completion_calls = state.completion_calls();
        let nodes_visited = state.visited_count();
        let insights = deduplicate(state.into_insights());
        reporter.report_completed();

        Ok(AnalysisReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            completion_calls,
            nodes_visited,
            domain: self.prompts.domain().to_string(),
            insights,
        })
    }

    async fn run(
        &self,
        graph: &GraphData,
        reporter: &ProgressReporter,
    ) -> Result<TraversalState, AnalysisError> {
        reporter.report_started();

        let mut state = TraversalState::new(graph.nodes.first().map(|n| n.id.clone()));
        if graph.is_empty() {
            state.advance(Phase::Done);
            return Ok(state);
        }

        let graph_text = graph.to_prompt_text();
        let options = self.config.completion_options();
        let mut synthesize = false;

        state.advance(Phase::Traversing);
        while state.may_traverse(self.config.attempts, self.config.insight_cap) {
            let Some(node) = state.select_node(graph) else {
                tracing::debug!("Every node visited");
                break;
            };

            reporter.report_analyzing(&node.id, &node.label);
            state.mark_visited(&node.id);

            let prompt = self
                .prompts
                .analysis_prompt(&graph_text, Some(node), state.insights());
            let text = self
                .client
                .complete(&prompt, options)
                .await
                .map_err(|source| AnalysisError::Completion {
                    stage: format!("analyzing node {}", node.id),
                    source,
                })?;
            state.record_traversal_call();

            let parsed = parse_response(&text);
            match parsed.insight {
                Some(insight) if insight.confidence > self.config.acceptance_threshold => {
                    reporter.report_insight(&insight.description);
                    state.accept(insight);
                }
                Some(insight) => {
                    tracing::debug!(
                        node_id = %node.id,
                        confidence = insight.confidence,
                        "Insight below acceptance threshold"
                    );
                }
                None => {
                    tracing::debug!(node_id = %node.id, "No parseable insight in completion");
                }
            }

            match parsed.next {
                Some(NextDirective::Synthesize) => {
                    synthesize = true;
                    break;
                }
                _ if state.accepted() >= self.config.insight_cap => {
                    synthesize = true;
                    break;
                }
                Some(NextDirective::Node(id)) => state.set_current(Some(id)),
                // DONE names no node, so it falls back like a missing directive
                Some(NextDirective::Done) | None => state.set_current(None),
            }
        }

        if synthesize && state.advance(Phase::Synthesizing) {
            self.synthesize(&mut state, reporter, options).await?;
        }

        state.advance(Phase::Done);
        Ok(state)
    }

    async fn synthesize(
        &self,
        state: &mut TraversalState,
        reporter: &ProgressReporter,
        options: CompletionOptions,
    ) -> Result<(), AnalysisError> {
        reporter.report_synthesizing();

        let prompt = self.prompts.synthesis_prompt(state.insights());
        let text = self
            .client
            .complete(&prompt, options)
            .await
            .map_err(|source| AnalysisError::Completion {
                stage: "synthesizing insights".to_string(),
                source,
            })?;
        state.record_synthesis_call();

        // Synthesis bypasses the confidence gate
        if let Some(insight) = parse_response(&text).insight {
            state.append_synthesis(insight);
            reporter.report_synthesis_generated();
        } else {
            tracing::debug!("No parseable synthesis insight");
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::float_cmp
)]
mod tests {
    use super::*;
    use crate::error::CompletionError;
    use crate::graph::{Edge, Node, NodeType};
    use crate::test_utils::{completion, recording_config, sample_graph, ScriptedClient};
    use crate::traits::MockCompletionClient;
    use mockall::Sequence;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn chain_graph(n: usize) -> GraphData {
        let nodes = (0..n)
            .map(|i| Node::new(format!("n{i}"), format!("Node {i}"), NodeType::Topic))
            .collect::<Vec<_>>();
        let edges = (1..n)
            .map(|i| Edge::new(format!("n{}", i - 1), format!("n{i}"), "related_to"))
            .collect();
        GraphData::new(nodes, edges)
    }

    #[tokio::test]
    async fn test_alice_bob_scenario() {
        let client = ScriptedClient::new([
            completion("Alice and Bob share an employer", 85, "a, b", "SYNTHESIZE"),
            completion("Their network is tightly knit", 60, "a, b", "DONE"),
        ]);
        let (config, events) = recording_config();
        let analyzer = GraphAnalyzer::new(&client, config);

        let insights = analyzer.analyze(&sample_graph()).await.unwrap();

        assert_eq!(insights.len(), 2);
        assert_eq!(insights[0].description, "Alice and Bob share an employer");
        assert_eq!(insights[1].description, "Their network is tightly knit");
        assert_eq!(client.calls(), 2);

        let events = events.lock().unwrap();
        let messages: Vec<&str> = events.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Beginning graph analysis...",
                "Analyzing node: Alice",
                "Found insight: Alice and Bob share an employer",
                "Synthesizing insights...",
                "Generated synthesis insight!",
                "Analysis complete!",
            ]
        );
        assert_eq!(events[1].node_id.as_deref(), Some("a"));
        let run_id = &events[0].run_id;
        assert!(events.iter().all(|e| &e.run_id == run_id));
    }

    #[tokio::test]
    async fn test_confidence_gate_70_rejected_71_accepted() {
        let client = ScriptedClient::new([
            completion("At the threshold", 70, "a", "b"),
            completion("Just above", 71, "b", "DONE"),
        ]);
        let (config, events) = recording_config();
        let insights = GraphAnalyzer::new(&client, config)
            .analyze(&sample_graph())
            .await
            .unwrap();

        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].description, "Just above");
        assert_eq!(client.calls(), 3);

        let found: Vec<String> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message.starts_with("Found insight"))
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(found, vec!["Found insight: Just above"]);
    }

    #[tokio::test]
    async fn test_synthesis_accepts_zero_confidence() {
        let client = ScriptedClient::new([
            completion("Seed", 90, "a", "SYNTHESIZE"),
            completion("Synthesis", 0, "a", "DONE"),
        ]);
        let insights = GraphAnalyzer::new(&client, AnalysisConfig::new())
            .analyze(&sample_graph())
            .await
            .unwrap();
        assert_eq!(insights.len(), 2);
        assert_eq!(insights[1].confidence, 0);
    }

    #[tokio::test]
    async fn test_insight_cap_triggers_synthesis() {
        let client = ScriptedClient::new([
            completion("First", 90, "n0", "n1"),
            completion("Second", 90, "n1", "n2"),
            completion("Third", 90, "n2", "n3"),
            completion("Combined", 80, "n0, n1, n2", "DONE"),
        ]);
        let (config, events) = recording_config();
        let report = GraphAnalyzer::new(&client, config)
            .analyze_report(&chain_graph(6))
            .await
            .unwrap();

        assert_eq!(report.completion_calls, 4);
        assert_eq!(report.nodes_visited, 3);
        let descriptions: Vec<&str> = report
            .insights
            .iter()
            .map(|i| i.description.as_str())
            .collect();
        assert_eq!(descriptions, vec!["First", "Second", "Third", "Combined"]);
        assert!(client.prompts()[3].contains("Insight 3: Third"));
        assert!(events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.message == MSG_SYNTHESIZING));
    }

    #[tokio::test]
    async fn test_cap_takes_priority_over_done() {
        let client = ScriptedClient::new([
            completion("Only", 90, "a", "DONE"),
            completion("Synth", 90, "a", "DONE"),
        ]);
        let config = AnalysisConfig::new().with_insight_cap(1);
        let insights = GraphAnalyzer::new(&client, config)
            .analyze(&sample_graph())
            .await
            .unwrap();
        assert_eq!(client.calls(), 2);
        assert_eq!(insights.len(), 2);
    }

    #[tokio::test]
    async fn test_done_falls_back_to_unvisited_nodes() {
        let client = ScriptedClient::new([
            completion("Only", 90, "a", "DONE"),
            completion("Weak", 20, "b", "DONE"),
            completion("Weaker", 10, "acme", "DONE"),
        ]);
        let (config, events) = recording_config();
        let insights = GraphAnalyzer::new(&client, config)
            .analyze(&sample_graph())
            .await
            .unwrap();

        assert_eq!(client.calls(), 3);
        assert_eq!(insights.len(), 1);

        let events = events.lock().unwrap();
        let analyzed: Vec<&str> = events.iter().filter_map(|e| e.node_id.as_deref()).collect();
        assert_eq!(analyzed, vec!["a", "b", "acme"]);
        assert!(!events.iter().any(|e| e.message == MSG_SYNTHESIZING));
        assert_eq!(events.last().map(|e| e.message.as_str()), Some(MSG_COMPLETE));
    }

    #[tokio::test]
    async fn test_follows_model_directed_node() {
        let client = ScriptedClient::new([
            completion("From first", 50, "n0", "n3"),
            completion("From n3", 50, "n3", "DONE"),
        ]);
        let (config, events) = recording_config();
        GraphAnalyzer::new(&client, config)
            .analyze(&chain_graph(5))
            .await
            .unwrap();

        let analyzed: Vec<Option<String>> = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message.starts_with("Analyzing node"))
            .map(|e| e.node_id.clone())
            .collect();
        assert_eq!(
            analyzed,
            vec![
                Some("n0".into()),
                Some("n3".into()),
                Some("n1".into()),
                Some("n2".into()),
                Some("n4".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_fallback_on_unknown_and_visited_ids() {
        let client = ScriptedClient::new([
            completion("x", 10, "n0", "no-such-node"),
            completion("y", 10, "n1", "n0"),
            completion("z", 10, "n2", "DONE"),
        ]);
        let (config, events) = recording_config();
        GraphAnalyzer::new(&client, config)
            .analyze(&chain_graph(4))
            .await
            .unwrap();

        let analyzed: Vec<String> = events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.node_id.clone())
            .collect();
        assert_eq!(analyzed, vec!["n0", "n1", "n2", "n3"]);
    }

    #[tokio::test]
    async fn test_garbage_responses_exhaust_nodes() {
        let client = ScriptedClient::new(Vec::<String>::new()).with_fallback("not the grammar");
        let insights = GraphAnalyzer::new(&client, AnalysisConfig::new())
            .analyze(&chain_graph(3))
            .await
            .unwrap();
        assert!(insights.is_empty());
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_attempts_budget() {
        let client = ScriptedClient::new(Vec::<String>::new()).with_fallback("garbage");
        let config = AnalysisConfig::new().with_attempts(2);
        GraphAnalyzer::new(&client, config)
            .analyze(&chain_graph(10))
            .await
            .unwrap();
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_graph() {
        let client = ScriptedClient::new(Vec::<String>::new());
        let (config, events) = recording_config();
        let insights = GraphAnalyzer::new(&client, config)
            .analyze(&GraphData::default())
            .await
            .unwrap();

        assert!(insights.is_empty());
        assert_eq!(client.calls(), 0);
        let messages: Vec<String> = events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect();
        assert_eq!(messages, vec![MSG_BEGIN, MSG_COMPLETE]);
    }

    #[tokio::test]
    async fn test_completion_error_aborts() {
        let mut mock = MockCompletionClient::new();
        let mut seq = Sequence::new();
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(completion("Kept?", 95, "a", "b")));
        mock.expect_complete()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Err(CompletionError::ModelUnavailable {
                    model: "local-model".into(),
                })
            });

        let (config, events) = recording_config();
        let err = GraphAnalyzer::new(mock, config)
            .analyze(&sample_graph())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AnalysisError::Completion {
                stage: "analyzing node b".into(),
                source: CompletionError::ModelUnavailable {
                    model: "local-model".into()
                },
            }
        );
        assert!(!events
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.message == MSG_COMPLETE));
    }

    #[tokio::test]
    async fn test_synthesis_error_aborts() {
        let client = ScriptedClient::from_results([
            Ok(completion("Seed", 90, "a", "SYNTHESIZE")),
            Err(CompletionError::Timeout { timeout_ms: 1000 }),
        ]);
        let err = GraphAnalyzer::new(&client, AnalysisConfig::new())
            .analyze(&sample_graph())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Completion failed while synthesizing insights"));
        assert_eq!(
            err.completion_error(),
            Some(&CompletionError::Timeout { timeout_ms: 1000 })
        );
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_completion() {
        let mock = MockCompletionClient::new();
        let err = GraphAnalyzer::new(mock, AnalysisConfig::new().with_insight_cap(0))
            .analyze(&sample_graph())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidConfig { ref field, .. } if field == "insight_cap"));
    }

    #[tokio::test]
    async fn test_options_forwarded() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .withf(|prompt, options| {
                prompt.contains("Currently focusing on node: Alice (person)")
                    && options.max_tokens == 321
                    && options.temperature == 0.25
            })
            .times(1)
            .returning(|_, _| Ok(completion("x", 10, "a", "DONE")));

        let config = AnalysisConfig::new()
            .with_attempts(1)
            .with_max_tokens(321)
            .with_temperature(0.25);
        GraphAnalyzer::new(mock, config)
            .analyze(&sample_graph())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_previous_insights_in_later_prompts() {
        let client = ScriptedClient::new([
            completion("Alice works at Acme", 90, "a", "b"),
            completion("Bob too", 40, "b", "DONE"),
        ]);
        GraphAnalyzer::new(&client, AnalysisConfig::new())
            .analyze(&sample_graph())
            .await
            .unwrap();
        let prompts = client.prompts();
        assert!(prompts[0].contains("Previous insights found:\n\n"));
        assert!(prompts[1].contains("Previous insights found:\n- Alice works at Acme\n"));
    }

    #[tokio::test]
    async fn test_duplicates_removed_from_result() {
        let client = ScriptedClient::new([
            completion("Same finding", 90, "n0", "n1"),
            completion("same FINDING", 95, "n1", "DONE"),
        ]);
        let insights = GraphAnalyzer::new(&client, AnalysisConfig::new())
            .analyze(&chain_graph(3))
            .await
            .unwrap();
        assert_eq!(insights.len(), 1);
        assert_eq!(insights[0].confidence, 90);
    }

    #[tokio::test]
    async fn test_analyze_section() {
        let graph = chain_graph(5);
        let client = ScriptedClient::new(Vec::<String>::new()).with_fallback("garbage");
        GraphAnalyzer::new(&client, AnalysisConfig::new())
            .analyze_section(&graph, &["n2".to_string()])
            .await
            .unwrap();

        assert_eq!(client.calls(), 3);
        let prompt = &client.prompts()[0];
        assert!(prompt.contains("- Node 1 (topic)"));
        assert!(prompt.contains("- Node 3 (topic)"));
        assert!(!prompt.contains("- Node 0 (topic)"));
        assert!(!prompt.contains("- Node 4 (topic)"));
    }

    #[tokio::test]
    async fn test_analyze_section_empty_selection() {
        let client = ScriptedClient::new(Vec::<String>::new());
        let insights = GraphAnalyzer::new(&client, AnalysisConfig::new())
            .analyze_section(&sample_graph(), &[])
            .await
            .unwrap();
        assert!(insights.is_empty());
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_report_metadata() {
        let client = ScriptedClient::new([completion("Only", 90, "a", "DONE")]);
        let (config, events) = recording_config();
        let report = GraphAnalyzer::new(&client, config)
            .with_prompts(PromptBuilder::new().with_domain("office politics"))
            .analyze_report(&sample_graph())
            .await
            .unwrap();

        assert_eq!(report.completion_calls, 3);
        assert_eq!(report.nodes_visited, 3);
        assert_eq!(report.domain, "office politics");
        assert!(report.finished_at >= report.started_at);
        assert_eq!(report.run_id.get_version_num(), 4);
        assert_eq!(events.lock().unwrap()[0].run_id, report.run_id.to_string());
    }

    #[tokio::test]
    async fn test_runs_are_independent() {
        let client = ScriptedClient::new(Vec::<String>::new()).with_fallback(completion(
            "Repeated",
            90,
            "a",
            "DONE",
        ));
        let analyzer = GraphAnalyzer::new(&client, AnalysisConfig::new());
        let first = analyzer.analyze(&sample_graph()).await.unwrap();
        let second = analyzer.analyze(&sample_graph()).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        // Three nodes reach the cap, then one synthesis call per run
        assert_eq!(client.calls(), 8);
    }

    #[test]
    fn test_config_defaults() {
        let config = AnalysisConfig::new();
        assert_eq!(config.attempts, 8);
        assert_eq!(config.temperature, 0.7);
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.insight_cap, 3);
        assert_eq!(config.acceptance_threshold, 70);
        assert!(config.on_log.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let cases = [
            (AnalysisConfig::new().with_attempts(0), "attempts"),
            (AnalysisConfig::new().with_temperature(f32::NAN), "temperature"),
            (AnalysisConfig::new().with_temperature(-1.0), "temperature"),
            (AnalysisConfig::new().with_max_tokens(0), "max_tokens"),
            (AnalysisConfig::new().with_insight_cap(0), "insight_cap"),
            (
                AnalysisConfig::new().with_acceptance_threshold(100),
                "acceptance_threshold",
            ),
        ];
        for (config, expected) in cases {
            match config.validate() {
                Err(AnalysisError::InvalidConfig { field, .. }) => assert_eq!(field, expected),
                other => panic!("{expected}: unexpected {other:?}"),
            }
        }
    }

    fn directive() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("SYNTHESIZE".to_string()),
            Just("DONE".to_string()),
            Just(String::new()),
            Just("ghost".to_string()),
            (0usize..12).prop_map(|i| format!("n{i}")),
        ]
    }

    fn scripted_response() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u8..=120, directive()).prop_map(|(c, next)| completion("Finding", c, "n0", &next)),
            "[ -~\n]{0,80}",
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_run_terminates_within_bound(
            n in 0usize..10,
            attempts in 1usize..12,
            cap in 1usize..5,
            responses in proptest::collection::vec(scripted_response(), 0..30),
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let client = ScriptedClient::new(responses).with_fallback(completion("Loop", 99, "n0", "n0"));
            let config = AnalysisConfig::new().with_attempts(attempts).with_insight_cap(cap);
            let report = runtime
                .block_on(GraphAnalyzer::new(&client, config).analyze_report(&chain_graph(n)))
                .unwrap();

            prop_assert!(report.completion_calls <= n.min(attempts) + 1);
            prop_assert_eq!(report.completion_calls, client.calls());
            prop_assert!(report.nodes_visited <= n);
            prop_assert!(report.insights.len() <= cap + 1);
        }
    }
}

//! End-to-end analysis against a streaming model server.
//!
//! Tests the full path: graph → prompt → HTTP/SSE → accumulation → parse →
//! traversal → synthesis → deduplication.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use graph_insights::analysis::{GraphAnalyzer, MSG_COMPLETE, MSG_SYNTHESIZING};
use graph_insights::prompts::PromptBuilder;
use pretty_assertions::assert_eq;
use wiremock::MockServer;

use super::support::{client_for, completion, messages, office_graph, recording_config, respond_when};

#[tokio::test]
async fn test_model_directed_walk_with_synthesis() {
    let server = MockServer::start().await;
    respond_when(
        &server,
        "Currently focusing on node: Alice (person)",
        &completion("Alice and Bob share an employer", 88, "alice, bob, acme", "town"),
    )
    .await;
    respond_when(
        &server,
        "Currently focusing on node: Springfield (place)",
        &completion("Acme anchors Springfield", 75, "acme, town", "SYNTHESIZE"),
    )
    .await;
    respond_when(
        &server,
        "You are synthesizing insights",
        &completion("Acme is the hub of this network", 40, "alice, bob, acme, town", "DONE"),
    )
    .await;

    let (config, events) = recording_config();
    let analyzer = GraphAnalyzer::new(client_for(&server), config);
    let report = analyzer.analyze_report(&office_graph()).await.unwrap();

    let descriptions: Vec<&str> = report.insights.iter().map(|i| i.description.as_str()).collect();
    assert_eq!(
        descriptions,
        vec![
            "Alice and Bob share an employer",
            "Acme anchors Springfield",
            "Acme is the hub of this network",
        ]
    );
    assert_eq!(report.completion_calls, 3);
    assert_eq!(report.nodes_visited, 2);
    assert_eq!(report.insights[2].confidence, 40);
    assert_eq!(report.insights[0].related_nodes, vec!["alice", "bob", "acme"]);

    assert_eq!(
        messages(&events),
        vec![
            "Beginning graph analysis...",
            "Analyzing node: Alice",
            "Found insight: Alice and Bob share an employer",
            "Analyzing node: Springfield",
            "Found insight: Acme anchors Springfield",
            "Synthesizing insights...",
            "Generated synthesis insight!",
            "Analysis complete!",
        ]
    );
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_low_confidence_walk_visits_every_node_once() {
    let server = MockServer::start().await;
    for label in ["Alice (person)", "Bob (person)", "Acme (organization)", "Acme is hiring (claim)", "Springfield (place)"] {
        respond_when(
            &server,
            &format!("Currently focusing on node: {label}"),
            // Always points back at the first node, which is already visited
            &completion("Weak hunch", 30, "alice", "alice"),
        )
        .await;
    }

    let (config, events) = recording_config();
    let insights = GraphAnalyzer::new(client_for(&server), config)
        .analyze(&office_graph())
        .await
        .unwrap();

    assert!(insights.is_empty());
    let analyzed: Vec<String> = events
        .lock()
        .unwrap()
        .iter()
        .filter_map(|e| e.node_id.clone())
        .collect();
    assert_eq!(analyzed, vec!["alice", "bob", "acme", "claim-1", "town"]);
    assert!(!messages(&events).contains(&MSG_SYNTHESIZING.to_string()));
    assert_eq!(messages(&events).last().map(String::as_str), Some(MSG_COMPLETE));
}

#[tokio::test]
async fn test_custom_domain_reaches_the_model() {
    let server = MockServer::start().await;
    // Both the analysis and the synthesis prompts carry the domain
    respond_when(
        &server,
        "about a small company",
        &completion("Small team", 90, "alice", "DONE"),
    )
    .await;

    let analyzer = GraphAnalyzer::new(client_for(&server), recording_config().0)
        .with_prompts(PromptBuilder::new().with_domain("a small company"));
    let report = analyzer.analyze_report(&office_graph()).await.unwrap();

    // DONE falls back to the next node until the cap forces synthesis
    assert_eq!(report.completion_calls, 4);
    assert_eq!(report.nodes_visited, 3);
    assert_eq!(report.domain, "a small company");
    assert_eq!(report.insights.len(), 1);
    assert_eq!(report.insights[0].description, "Small team");
}

#[tokio::test]
async fn test_section_analysis_only_sends_section() {
    let server = MockServer::start().await;
    respond_when(&server, "messages", "no structured answer").await;

    let client = client_for(&server);
    let analyzer = GraphAnalyzer::new(client, recording_config().0);
    let insights = analyzer
        .analyze_section(&office_graph(), &["claim-1".to_string()])
        .await
        .unwrap();
    assert!(insights.is_empty());

    let requests = server.received_requests().await.unwrap();
    // claim-1 and its neighbour acme
    assert_eq!(requests.len(), 2);
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.contains("Acme is hiring"));
    assert!(!body.contains("Springfield"));
    assert!(!body.contains("Alice"));
}

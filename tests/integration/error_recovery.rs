//! Failure paths: runtime errors abort the run, malformed output does not.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use graph_insights::analysis::{AnalysisConfig, GraphAnalyzer, MSG_COMPLETE};
use graph_insights::error::{AnalysisError, CompletionError};
use graph_insights::graph::GraphData;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::support::{client_for, completion, messages, office_graph, recording_config, respond_when};

#[tokio::test]
async fn test_model_not_loaded_aborts_without_completion_notice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("loading model"))
        .expect(1)
        .mount(&server)
        .await;

    let (config, events) = recording_config();
    let err = GraphAnalyzer::new(client_for(&server), config)
        .analyze(&office_graph())
        .await
        .unwrap_err();

    match &err {
        AnalysisError::Completion { stage, source } => {
            assert_eq!(stage, "analyzing node alice");
            assert!(matches!(source, CompletionError::ModelUnavailable { .. }));
            assert!(source.is_retryable());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(
        messages(&events),
        vec!["Beginning graph analysis...", "Analyzing node: Alice"]
    );
}

#[tokio::test]
async fn test_mid_stream_error_aborts() {
    let server = MockServer::start().await;
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"INSIGHT: part\"}}]}\n\n\
                data: {\"error\":{\"message\":\"kv cache full\"}}\n\n";
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let (config, events) = recording_config();
    let err = GraphAnalyzer::new(client_for(&server), config)
        .analyze(&office_graph())
        .await
        .unwrap_err();

    assert_eq!(
        err.completion_error(),
        Some(&CompletionError::UnexpectedResponse {
            message: "kv cache full".into()
        })
    );
    assert!(!messages(&events).contains(&MSG_COMPLETE.to_string()));
}

#[tokio::test]
async fn test_malformed_output_is_not_an_error() {
    let server = MockServer::start().await;
    respond_when(&server, "messages", "I think Alice is interesting. CONFIDENCE: high").await;

    let insights = GraphAnalyzer::new(client_for(&server), AnalysisConfig::new().with_attempts(2))
        .analyze(&office_graph())
        .await
        .unwrap();

    assert!(insights.is_empty());
    assert_eq!(server.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_duplicate_insights_collapsed() {
    let server = MockServer::start().await;
    respond_when(
        &server,
        "Currently focusing on node: Alice (person)",
        &completion("Acme employs both analysts and engineers", 90, "acme", "bob"),
    )
    .await;
    respond_when(
        &server,
        "Currently focusing on node: Bob (person)",
        &completion("ACME employs both analysts and engineers", 95, "acme", "DONE"),
    )
    .await;
    for label in ["Acme (organization)", "Acme is hiring (claim)", "Springfield (place)"] {
        respond_when(
            &server,
            &format!("Currently focusing on node: {label}"),
            "Nothing more to add.",
        )
        .await;
    }

    let insights = GraphAnalyzer::new(client_for(&server), AnalysisConfig::new())
        .analyze(&office_graph())
        .await
        .unwrap();

    assert_eq!(insights.len(), 1);
    assert_eq!(insights[0].confidence, 90);
    assert_eq!(server.received_requests().await.unwrap().len(), 5);
}

#[tokio::test]
async fn test_empty_graph_makes_no_requests() {
    let server = MockServer::start().await;
    let (config, events) = recording_config();
    let insights = GraphAnalyzer::new(client_for(&server), config)
        .analyze(&GraphData::default())
        .await
        .unwrap();

    assert!(insights.is_empty());
    assert!(server.received_requests().await.unwrap().is_empty());
    assert_eq!(
        messages(&events),
        vec!["Beginning graph analysis...", "Analysis complete!"]
    );
}

//! Shared fixtures: a wiremock model server speaking SSE, graphs and
//! completion text builders.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::{Arc, Mutex};

use graph_insights::analysis::{AnalysisConfig, ProgressEvent};
use graph_insights::graph::{Edge, GraphData, Node, NodeType};
use graph_insights::llm::{ClientConfig, LocalModelClient};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Render a well-formed completion.
pub fn completion(description: &str, confidence: u8, nodes: &str, next: &str) -> String {
    format!(
        "INSIGHT: {description}\nREASONING: 1. First observation\n2. Second observation\nCONFIDENCE: {confidence}\nNODES: {nodes}\nNEXT_NODE: {next}"
    )
}

/// Split `text` into streamed chat chunks of at most `size` characters.
pub fn sse_body(text: &str, size: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut body = String::new();
    for piece in chars.chunks(size.max(1)) {
        let fragment: String = piece.iter().collect();
        let payload = serde_json::json!({
            "object": "chat.completion.chunk",
            "choices": [{"index": 0, "delta": {"content": fragment}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {payload}\n\n"));
    }
    body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    body
}

/// Answer requests whose body contains `needle` with `text`, streamed.
pub async fn respond_when(server: &MockServer, needle: &str, text: &str) {
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains(needle))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse_body(text, 7), "text/event-stream"))
        .mount(server)
        .await;
}

/// Client pointed at the mock server.
pub fn client_for(server: &MockServer) -> LocalModelClient {
    let config = ClientConfig::new()
        .with_base_url(server.uri())
        .with_timeout_ms(5_000);
    LocalModelClient::new(config).unwrap()
}

/// People, a company and a claim.
pub fn office_graph() -> GraphData {
    GraphData::new(
        vec![
            Node::new("alice", "Alice", NodeType::Person).with_description("Engineer"),
            Node::new("bob", "Bob", NodeType::Person).with_description("Analyst"),
            Node::new("acme", "Acme", NodeType::Organization),
            Node::new("claim-1", "Acme is hiring", NodeType::Claim),
            Node::new("town", "Springfield", NodeType::Place),
        ],
        vec![
            Edge::new("alice", "acme", "works_for"),
            Edge::new("bob", "acme", "works_for"),
            Edge::new("claim-1", "acme", "mentions"),
            Edge::new("acme", "town", "located_in"),
        ],
    )
}

/// Default config recording every progress event.
pub fn recording_config() -> (AnalysisConfig, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let config = AnalysisConfig::new().with_on_log(move |e| sink.lock().unwrap().push(e.clone()));
    (config, events)
}

/// Messages of recorded events.
pub fn messages(events: &Arc<Mutex<Vec<ProgressEvent>>>) -> Vec<String> {
    events.lock().unwrap().iter().map(|e| e.message.clone()).collect()
}

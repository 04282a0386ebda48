//! Graph files: loading, validation and merging.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use graph_insights::error::GraphError;
use graph_insights::graph::{EdgeType, GraphData, NodeType};
use tempfile::TempDir;

async fn load(dir: &TempDir, name: &str, json: &str) -> Result<GraphData, GraphError> {
    let path = dir.path().join(name);
    tokio::fs::write(&path, json).await.unwrap();
    GraphData::from_path(&path).await
}

#[tokio::test]
async fn test_load_with_metadata_and_unknown_edge_type() {
    let dir = TempDir::new().unwrap();
    let graph = load(
        &dir,
        "g.json",
        r#"{
            "nodes": [
                {"id": "s1", "label": "Daily Herald", "type": "source",
                 "metadata": {"url": "https://example.org", "date": "2024-06-01", "reliability": 0.8}},
                {"id": "t1", "label": "Drones", "type": "topic"}
            ],
            "edges": [{"id": "e1", "from": "s1", "to": "t1", "type": "covers"}]
        }"#,
    )
    .await
    .unwrap();

    assert_eq!(graph.nodes[0].node_type, NodeType::Source);
    let metadata = graph.nodes[0].metadata.as_ref().unwrap();
    assert_eq!(metadata.url.as_deref(), Some("https://example.org"));
    assert!(metadata.extra.contains_key("reliability"));
    assert_eq!(graph.edges[0].edge_type, EdgeType::from("covers"));
    assert_eq!(
        graph.to_prompt_text(),
        "Nodes:\n- Daily Herald (source): \n- Drones (topic): \n\nConnections:\n- Daily Herald covers Drones\n"
    );
}

#[tokio::test]
async fn test_unknown_node_type_rejected() {
    let dir = TempDir::new().unwrap();
    let err = load(
        &dir,
        "bad.json",
        r#"{"nodes":[{"id":"x","label":"X","type":"spaceship"}]}"#,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, GraphError::Malformed { .. }));
}

#[tokio::test]
async fn test_duplicate_ids_rejected() {
    let dir = TempDir::new().unwrap();
    let err = load(
        &dir,
        "dup.json",
        r#"{"nodes":[{"id":"x","label":"A","type":"topic"},{"id":"x","label":"B","type":"topic"}]}"#,
    )
    .await
    .unwrap_err();
    assert_eq!(err, GraphError::DuplicateNodeId { id: "x".into() });
}

#[tokio::test]
async fn test_merge_files_keeps_first_position() {
    let dir = TempDir::new().unwrap();
    let first = load(
        &dir,
        "1.json",
        r#"{"nodes":[{"id":"a","label":"Old A","type":"topic"},{"id":"b","label":"B","type":"topic"}]}"#,
    )
    .await
    .unwrap();
    let second = load(
        &dir,
        "2.json",
        r#"{"nodes":[{"id":"c","label":"C","type":"topic"},{"id":"a","label":"New A","type":"topic"}]}"#,
    )
    .await
    .unwrap();

    let merged = GraphData::merge([first, second]);
    let labels: Vec<&str> = merged.nodes.iter().map(|n| n.label.as_str()).collect();
    assert_eq!(labels, vec!["New A", "B", "C"]);
}

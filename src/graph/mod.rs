//! Knowledge graph input.
//!
//! This module provides:
//! - [`Node`], [`Edge`] and their type tags
//! - [`GraphData`]: the node/edge collections an analysis runs over
//! - [`format_graph`]: the prompt-ready textual rendering
//!
//! The analyzer never mutates graph data; the helpers here build new
//! [`GraphData`] values (merged sources, focused sections).

mod format;
mod types;

pub use format::format_graph;
pub use types::{Edge, EdgeType, Metadata, Node, NodeType};

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

/// An ordered set of nodes and edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphData {
    /// Graph vertices, in display order.
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// Directed relationships, in display order.
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphData {
    /// Create graph data from nodes and edges.
    #[must_use]
    pub const fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    /// Decode graph data from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Malformed`] for undecodable JSON (including
    /// unknown node types) and [`GraphError::DuplicateNodeId`] if two nodes
    /// share an id.
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        let graph: Self = serde_json::from_str(json).map_err(|e| GraphError::Malformed {
            message: e.to_string(),
        })?;
        graph.validate()?;
        Ok(graph)
    }

    /// Read and decode a graph JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if the file cannot be read, otherwise the
    /// errors of [`GraphData::from_json_str`].
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| GraphError::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        let graph = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            "Loaded graph"
        );
        Ok(graph)
    }

    /// Check that node ids are unique.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DuplicateNodeId`] naming the first repeated id.
    pub fn validate(&self) -> Result<(), GraphError> {
        let mut seen = HashSet::with_capacity(self.nodes.len());
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(GraphError::DuplicateNodeId {
                    id: node.id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Merge several graph sources into one.
    ///
    /// Later sources overwrite earlier nodes with the same id, and earlier
    /// edges with the same edge id, while the entry keeps the position where
    /// it first appeared. Edges without an id are always kept.
    #[must_use]
    pub fn merge<I>(sources: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut nodes: Vec<Node> = Vec::new();
        let mut node_slots: HashMap<String, usize> = HashMap::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut edge_slots: HashMap<String, usize> = HashMap::new();

        for source in sources {
            for node in source.nodes {
                if let Some(&slot) = node_slots.get(&node.id) {
                    nodes[slot] = node;
                } else {
                    node_slots.insert(node.id.clone(), nodes.len());
                    nodes.push(node);
                }
            }
            for edge in source.edges {
                match edge.id.as_ref().and_then(|id| edge_slots.get(id).copied()) {
                    Some(slot) => edges[slot] = edge,
                    None => {
                        if let Some(id) = &edge.id {
                            edge_slots.insert(id.clone(), edges.len());
                        }
                        edges.push(edge);
                    }
                }
            }
        }

        Self { nodes, edges }
    }

    /// Extract the section around a selection.
    ///
    /// The section holds the selected nodes plus every node one edge away
    /// from them, in the original node order, and only the edges whose
    /// endpoints both fall inside the section. Unknown ids in `selected` are
    /// ignored.
    #[must_use]
    pub fn section(&self, selected: &[String]) -> Self {
        let known: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
        let seeds: HashSet<&str> = selected
            .iter()
            .map(String::as_str)
            .filter(|id| known.contains(id))
            .collect();

        let mut members = seeds.clone();
        for edge in &self.edges {
            if seeds.contains(edge.from.as_str()) {
                members.insert(edge.to.as_str());
            }
            if seeds.contains(edge.to.as_str()) {
                members.insert(edge.from.as_str());
            }
        }

        let nodes = self
            .nodes
            .iter()
            .filter(|n| members.contains(n.id.as_str()))
            .cloned()
            .collect();
        let edges = self
            .edges
            .iter()
            .filter(|e| members.contains(e.from.as_str()) && members.contains(e.to.as_str()))
            .cloned()
            .collect();

        Self { nodes, edges }
    }

    /// Prompt-ready text for this graph.
    #[must_use]
    pub fn to_prompt_text(&self) -> String {
        format_graph(&self.nodes, &self.edges)
    }
}

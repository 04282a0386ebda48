//! Textual serialization of a graph for inclusion in a prompt.

use std::collections::HashMap;
use std::fmt::Write as _;

use super::types::{Edge, Node};

/// Render nodes and edges as a compact two-section text block.
///
/// Nodes appear as `- label (type): description` and edges as
/// `- fromLabel type toLabel`, both in input order. Edges with an endpoint
/// missing from `nodes` are skipped.
#[must_use]
pub fn format_graph(nodes: &[Node], edges: &[Edge]) -> String {
    let mut by_id: HashMap<&str, &Node> = HashMap::with_capacity(nodes.len());
    for node in nodes {
        by_id.entry(node.id.as_str()).or_insert(node);
    }

    let mut out = String::from("Nodes:\n");
    for node in nodes {
        // Writing to a String cannot fail.
        let _ = writeln!(
            out,
            "- {} ({}): {}",
            node.label,
            node.node_type,
            node.description()
        );
    }

    out.push_str("\nConnections:\n");
    for edge in edges {
        let (Some(from), Some(to)) = (by_id.get(edge.from.as_str()), by_id.get(edge.to.as_str()))
        else {
            tracing::trace!(from = %edge.from, to = %edge.to, "Skipping dangling edge");
            continue;
        };
        let _ = writeln!(out, "- {} {} {}", from.label, edge.edge_type, to.label);
    }

    out
}

//! Structured insights produced by an analysis run.

mod dedup;

pub use dedup::deduplicate;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest confidence an insight may carry.
pub const MAX_CONFIDENCE: u8 = 100;

/// One model-generated observation about the graph.
///
/// Created by the response parser and never mutated afterwards.
/// `related_nodes` holds whatever identifiers the model wrote; they are
/// labels, not validated references into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphInsight {
    /// One-sentence summary.
    pub description: String,
    /// Reasoning steps, in the order the model gave them.
    pub reasoning: Vec<String>,
    /// Confidence, 0 to 100.
    pub confidence: u8,
    /// Node identifiers the model associated with the insight.
    pub related_nodes: Vec<String>,
}

impl GraphInsight {
    /// Create an insight. Confidence is clamped to [`MAX_CONFIDENCE`].
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        reasoning: Vec<String>,
        confidence: u8,
        related_nodes: Vec<String>,
    ) -> Self {
        Self {
            description: description.into(),
            reasoning,
            confidence: confidence.min(MAX_CONFIDENCE),
            related_nodes,
        }
    }

    /// Key used for duplicate detection.
    #[must_use]
    pub fn dedup_key(&self) -> String {
        self.description.to_lowercase()
    }
}

/// Renders the insight as a card: description, confidence, the reasoning
/// lines as the model numbered them, and related nodes.
impl fmt::Display for GraphInsight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        writeln!(f, "Confidence: {}%", self.confidence)?;
        if !self.reasoning.is_empty() {
            writeln!(f, "Reasoning:")?;
            for step in &self.reasoning {
                writeln!(f, "  {step}")?;
            }
        }
        write!(f, "Related Nodes: {}", self.related_nodes.join(", "))
    }
}

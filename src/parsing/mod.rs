//! Parsing of model completions into insights.
//!
//! The model is asked to answer in a rigid five-field grammar:
//!
//! ```text
//! INSIGHT: <one-sentence description>
//! REASONING: <numbered or freeform lines>
//! CONFIDENCE: <integer 0-100>
//! NODES: <comma-separated identifiers>
//! NEXT_NODE: <node id> | SYNTHESIZE | DONE
//! ```
//!
//! Each field runs from its label to the line where the next expected label
//! starts. A completion missing any field yields [`ParsedResponse::empty`];
//! that is an ordinary outcome, not an error.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::insight::{GraphInsight, MAX_CONFIDENCE};

/// Label introducing the description field.
pub const INSIGHT_LABEL: &str = "INSIGHT:";
/// Label introducing the reasoning field.
pub const REASONING_LABEL: &str = "REASONING:";
/// Label introducing the confidence field.
pub const CONFIDENCE_LABEL: &str = "CONFIDENCE:";
/// Label introducing the related-nodes field.
pub const NODES_LABEL: &str = "NODES:";
/// Label introducing the next-node directive.
pub const NEXT_NODE_LABEL: &str = "NEXT_NODE:";

/// Directive value asking for the synthesis pass.
pub const SYNTHESIZE_SENTINEL: &str = "SYNTHESIZE";
/// Directive value asking to stop.
pub const DONE_SENTINEL: &str = "DONE";

/// Where the model wants the traversal to go next.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NextDirective {
    /// Analyze this node id next. Untrusted: it may not exist.
    Node(String),
    /// Stop traversing and synthesize.
    Synthesize,
    /// The model has nothing more to say about this node. Carries no
    /// target, so the walk falls back to the next unvisited node.
    Done,
}

impl NextDirective {
    /// Interpret a raw `NEXT_NODE` value. Empty values carry no directive.
    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        match value.trim() {
            "" => None,
            SYNTHESIZE_SENTINEL => Some(Self::Synthesize),
            DONE_SENTINEL => Some(Self::Done),
            id => Some(Self::Node(id.to_string())),
        }
    }

    /// The node id, for [`NextDirective::Node`].
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::Node(id) => Some(id),
            Self::Synthesize | Self::Done => None,
        }
    }
}

impl fmt::Display for NextDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => f.write_str(id),
            Self::Synthesize => f.write_str(SYNTHESIZE_SENTINEL),
            Self::Done => f.write_str(DONE_SENTINEL),
        }
    }
}

/// Result of parsing one completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResponse {
    /// The insight, if every field was present and well-formed.
    pub insight: Option<GraphInsight>,
    /// The next-node directive.
    pub next: Option<NextDirective>,
}

impl ParsedResponse {
    /// The "nothing usable" result.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            insight: None,
            next: None,
        }
    }

    /// Whether parsing failed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.insight.is_none() && self.next.is_none()
    }
}

struct FieldPatterns {
    insight: Regex,
    reasoning: Regex,
    confidence: Regex,
    nodes: Regex,
    next_node: Regex,
}

impl FieldPatterns {
    fn compile() -> Result<Self, regex::Error> {
        Ok(Self {
            insight: Regex::new(r"(?s)INSIGHT:(.*?)\n[ \t]*REASONING:")?,
            reasoning: Regex::new(r"(?s)REASONING:(.*?)\n[ \t]*CONFIDENCE:")?,
            confidence: Regex::new(r"(?s)CONFIDENCE:(.*?)\n[ \t]*NODES:")?,
            nodes: Regex::new(r"(?s)NODES:(.*?)\n[ \t]*NEXT_NODE:")?,
            next_node: Regex::new(r"NEXT_NODE:([^\n]*)")?,
        })
    }
}

static PATTERNS: LazyLock<Result<FieldPatterns, regex::Error>> =
    LazyLock::new(FieldPatterns::compile);

fn capture<'t>(pattern: &Regex, text: &'t str) -> Option<&'t str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Parse a raw completion.
///
/// Never panics. Returns [`ParsedResponse::empty`] if any of the five fields
/// is missing, the description is blank, or the confidence does not start
/// with a number.
#[must_use]
pub fn parse_response(text: &str) -> ParsedResponse {
    let patterns = match PATTERNS.as_ref() {
        Ok(patterns) => patterns,
        Err(e) => {
            tracing::error!(error = %e, "Response patterns failed to compile");
            return ParsedResponse::empty();
        }
    };

    let fields = (
        capture(&patterns.insight, text),
        capture(&patterns.reasoning, text),
        capture(&patterns.confidence, text),
        capture(&patterns.nodes, text),
        capture(&patterns.next_node, text),
    );
    let (Some(description), Some(reasoning), Some(confidence), Some(nodes), Some(next)) = fields
    else {
        tracing::debug!(
            insight = fields.0.is_some(),
            reasoning = fields.1.is_some(),
            confidence = fields.2.is_some(),
            nodes = fields.3.is_some(),
            next_node = fields.4.is_some(),
            "Completion is missing required fields"
        );
        return ParsedResponse::empty();
    };

    let description = description.trim();
    if description.is_empty() {
        tracing::debug!("Completion has an empty INSIGHT field");
        return ParsedResponse::empty();
    }

    let Some(confidence) = parse_confidence(confidence) else {
        tracing::debug!(raw = confidence.trim(), "CONFIDENCE is not a number");
        return ParsedResponse::empty();
    };

    let insight = GraphInsight::new(
        description,
        split_lines(reasoning),
        confidence,
        split_identifiers(nodes),
    );

    ParsedResponse {
        insight: Some(insight),
        next: NextDirective::from_value(next),
    }
}

/// Leading digits of the field, clamped to 100.
fn parse_confidence(raw: &str) -> Option<u8> {
    let trimmed = raw.trim();
    let digits_end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let digits = trimmed.get(..digits_end)?;
    if digits.is_empty() {
        return None;
    }
    // Overlong digit runs saturate instead of failing.
    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    Some(u8::try_from(value.min(u64::from(MAX_CONFIDENCE))).unwrap_or(MAX_CONFIDENCE))
}

fn split_lines(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

fn split_identifiers(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
        .collect()
}

/// Render an insight in the response grammar.
///
/// This is the exact shape [`parse_response`] accepts; it backs the example
/// in the system prompt.
#[must_use]
pub fn render_response(insight: &GraphInsight, next: &NextDirective) -> String {
    format!(
        "{INSIGHT_LABEL} {}\n{REASONING_LABEL} {}\n{CONFIDENCE_LABEL} {}\n{NODES_LABEL} {}\n{NEXT_NODE_LABEL} {next}",
        insight.description,
        insight.reasoning.join("\n"),
        insight.confidence,
        insight.related_nodes.join(", "),
    )
}

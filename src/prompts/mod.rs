//! Prompt construction for graph analysis.
//!
//! Two prompt shapes:
//! - [`PromptBuilder::analysis_prompt`]: one traversal step, focused on a node
//! - [`PromptBuilder::synthesis_prompt`]: the final pass combining insights
//!
//! Both state the response grammar literally so that
//! [`parse_response`](crate::parsing::parse_response) can extract it.
//! Builders are pure: the same inputs always give the same prompt.

use std::fmt::Write as _;

use crate::graph::Node;
use crate::insight::GraphInsight;
use crate::parsing::{
    CONFIDENCE_LABEL, DONE_SENTINEL, INSIGHT_LABEL, NEXT_NODE_LABEL, NODES_LABEL,
    REASONING_LABEL, SYNTHESIZE_SENTINEL,
};

/// Default subject of the analysis framing sentence.
pub const DEFAULT_DOMAIN: &str = "entities, events and claims";

/// Default number of insights after which the model is told to synthesize.
pub const DEFAULT_INSIGHT_CAP: usize = 3;

/// Questions appended to every analysis prompt.
const ANALYSIS_CHECKLIST: [&str; 5] = [
    "What entities are most connected?",
    "Are there temporal patterns?",
    "Are there geographic patterns?",
    "What unusual connections stand out?",
    "What might this suggest about the subject of the graph?",
];

/// Builds analysis and synthesis prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    domain: String,
    insight_cap: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            insight_cap: DEFAULT_INSIGHT_CAP,
        }
    }
}

impl PromptBuilder {
    /// Create a builder with the default framing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what the knowledge graph is about, e.g. "drone activities".
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Set the insight count after which the model should ask to synthesize.
    #[must_use]
    pub const fn with_insight_cap(mut self, insight_cap: usize) -> Self {
        self.insight_cap = insight_cap;
        self
    }

    /// The subject of the framing sentence.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Fixed instruction block describing the task and the response grammar.
    #[must_use]
    pub fn system_instructions(&self) -> String {
        let cap = self.insight_cap;
        format!(
            "You are analyzing a knowledge graph about {domain}.
Focus on finding non-obvious connections and patterns.
Think carefully and explain your reasoning step by step.
Format your response EXACTLY like this example:

{INSIGHT_LABEL} Two people who work for the same organization both appear at the same event, suggesting a professional link
{REASONING_LABEL} 1. Both people have a works_for connection to one organization
2. Both are connected to the same event
3. The shared employer explains the shared appearance
{CONFIDENCE_LABEL} 85
{NODES_LABEL} person-1, person-2, organization-1, event-1
{NEXT_NODE_LABEL} [Pick an actual node from the graph to analyze next, or write {SYNTHESIZE_SENTINEL} if you've generated {cap} insights]

Your response MUST contain all these sections with the exact labels.
After generating {cap} insights, write {SYNTHESIZE_SENTINEL} as the NEXT_NODE to create a higher-level insight.",
            domain = self.domain,
        )
    }

    /// Prompt for one traversal step.
    ///
    /// `graph_text` is the output of [`format_graph`](crate::graph::format_graph),
    /// computed once per run. Only the descriptions of `previous` insights are
    /// included.
    #[must_use]
    pub fn analysis_prompt(
        &self,
        graph_text: &str,
        focus: Option<&Node>,
        previous: &[GraphInsight],
    ) -> String {
        let mut prompt = self.system_instructions();
        prompt.push_str("\n\nGraph context:\n");
        prompt.push_str(graph_text);

        if let Some(node) = focus {
            let _ = write!(
                prompt,
                "\nCurrently focusing on node: {} ({})\n",
                node.label, node.node_type
            );
        }

        prompt.push_str("\nPrevious insights found:\n");
        for insight in previous {
            let _ = writeln!(prompt, "- {}", insight.description);
        }

        prompt.push_str("\nThink step by step:\n");
        for (i, question) in ANALYSIS_CHECKLIST.iter().enumerate() {
            let _ = writeln!(prompt, "{}. {question}", i + 1);
        }

        let _ = write!(
            prompt,
            "\nRemember to format your response EXACTLY as shown in the example above.\n\
             After {} insights, write {SYNTHESIZE_SENTINEL} as the NEXT_NODE value.\n",
            self.insight_cap
        );
        prompt
    }

    /// Prompt for the synthesis pass over all accepted insights.
    ///
    /// The model is told to answer with `NEXT_NODE: DONE`.
    #[must_use]
    pub fn synthesis_prompt(&self, insights: &[GraphInsight]) -> String {
        format!(
            "You are synthesizing insights about {domain}.
Based on these previous insights, create a higher-level understanding.

Previous insights:
{listing}
Create a new, synthesized insight that combines and elevates these observations.
Format your response EXACTLY like this:

{INSIGHT_LABEL} [A higher-level insight that connects the patterns]
{REASONING_LABEL} 1. [First connection]
2. [Second connection]
3. [Higher-level implication]
{CONFIDENCE_LABEL} [0-100]
{NODES_LABEL} [All relevant nodes]
{NEXT_NODE_LABEL} {DONE_SENTINEL}",
            domain = self.domain,
            listing = render_insight_listing(insights),
        )
    }
}

/// Full rendering of insights for the synthesis prompt.
///
/// Each entry lists the description, every reasoning line, the confidence as
/// a percentage and the related nodes.
#[must_use]
pub fn render_insight_listing(insights: &[GraphInsight]) -> String {
    let mut out = String::new();
    for (i, insight) in insights.iter().enumerate() {
        let _ = writeln!(out, "\nInsight {}: {}", i + 1, insight.description);
        out.push_str("Reasoning:\n");
        for step in &insight.reasoning {
            let _ = writeln!(out, "{step}");
        }
        let _ = writeln!(out, "Confidence: {}%", insight.confidence);
        let _ = writeln!(out, "Related Nodes: {}", insight.related_nodes.join(", "));
    }
    out
}

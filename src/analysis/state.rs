//! Run-local traversal state.
//!
//! Model output decides where the walk goes next, so every move is checked
//! here: the phase only advances along `Idle -> Traversing -> Synthesizing ->
//! Done` (synthesis optional), nodes are visited at most once, and the
//! completion budget is counted.

use std::collections::HashSet;
use std::fmt;

use crate::graph::{GraphData, Node};
use crate::insight::GraphInsight;

/// Phase of an analysis run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing issued yet.
    Idle,
    /// Walking nodes, one completion per node.
    Traversing,
    /// Running the single synthesis completion.
    Synthesizing,
    /// Finished; no further completions.
    Done,
}

impl Phase {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Traversing | Self::Done)
                | (Self::Traversing, Self::Synthesizing | Self::Done)
                | (Self::Synthesizing, Self::Done)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Traversing => "traversing",
            Self::Synthesizing => "synthesizing",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// Mutable state of one run. Never shared between runs.
#[derive(Debug)]
pub struct TraversalState {
    phase: Phase,
    current: Option<String>,
    visited: HashSet<String>,
    insights: Vec<GraphInsight>,
    accepted: usize,
    traversal_calls: usize,
    synthesis_calls: usize,
}

impl TraversalState {
    /// Start at `first`, normally the first node of the graph.
    #[must_use]
    pub fn new(first: Option<String>) -> Self {
        Self {
            phase: Phase::Idle,
            current: first,
            visited: HashSet::new(),
            insights: Vec::new(),
            accepted: 0,
            traversal_calls: 0,
            synthesis_calls: 0,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Move to `next`. Illegal transitions are refused and leave the phase unchanged.
    pub fn advance(&mut self, next: Phase) -> bool {
        if self.phase.can_advance_to(next) {
            tracing::trace!(from = %self.phase, to = %next, "Traversal phase change");
            self.phase = next;
            true
        } else {
            tracing::warn!(from = %self.phase, to = %next, "Refused traversal phase change");
            false
        }
    }

    /// True while another traversal completion may be issued.
    #[must_use]
    pub fn may_traverse(&self, attempts: usize, insight_cap: usize) -> bool {
        self.phase == Phase::Traversing
            && self.traversal_calls < attempts
            && self.accepted < insight_cap
    }

    /// Set the node the model asked for next; `None` defers to the fallback.
    pub fn set_current(&mut self, id: Option<String>) {
        self.current = id;
    }

    /// Resolve the node to analyze next.
    ///
    /// The requested id is used when it names an unvisited node. Otherwise the
    /// first unvisited node in input order is chosen; `None` once every node
    /// has been visited.
    #[must_use]
    pub fn select_node<'g>(&self, graph: &'g GraphData) -> Option<&'g Node> {
        let requested = self
            .current
            .as_deref()
            .and_then(|id| graph.node(id))
            .filter(|node| !self.visited.contains(&node.id));

        if requested.is_none() {
            if let Some(id) = self.current.as_deref() {
                tracing::debug!(requested = %id, "Requested node unusable, falling back");
            }
        }

        requested.or_else(|| graph.nodes.iter().find(|n| !self.visited.contains(&n.id)))
    }

    /// Mark `id` visited. Returns false if it already was.
    pub fn mark_visited(&mut self, id: &str) -> bool {
        self.visited.insert(id.to_string())
    }

    /// Count one issued traversal completion.
    pub fn record_traversal_call(&mut self) {
        self.traversal_calls += 1;
    }

    /// Count the issued synthesis completion.
    pub fn record_synthesis_call(&mut self) {
        self.synthesis_calls += 1;
    }

    /// Append an insight that passed the confidence gate.
    pub fn accept(&mut self, insight: GraphInsight) {
        self.accepted += 1;
        self.insights.push(insight);
    }

    /// Append the synthesis insight. It does not count toward the cap.
    pub fn append_synthesis(&mut self, insight: GraphInsight) {
        self.insights.push(insight);
    }

    /// Insights so far, in acceptance order.
    #[must_use]
    pub fn insights(&self) -> &[GraphInsight] {
        &self.insights
    }

    /// Insights accepted during traversal.
    #[must_use]
    pub const fn accepted(&self) -> usize {
        self.accepted
    }

    /// Nodes visited so far.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Total completions issued.
    #[must_use]
    pub const fn completion_calls(&self) -> usize {
        self.traversal_calls + self.synthesis_calls
    }

    /// Consume the state, returning its insights.
    #[must_use]
    pub fn into_insights(self) -> Vec<GraphInsight> {
        self.insights
    }
}

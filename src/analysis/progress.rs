//! Progress notifications for analysis runs.
//!
//! This module provides:
//! - [`ProgressEvent`]: one caller-visible notification
//! - [`ProgressSink`]: where notifications go (callback or broadcast channel)
//! - [`ProgressReporter`]: per-run helper emitting the fixed message set
//!
//! Delivery is best-effort and synchronous with the run, so events arrive in
//! the order the run produced them.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Emitted once when a run starts.
pub const MSG_BEGIN: &str = "Beginning graph analysis...";
/// Emitted before the synthesis completion.
pub const MSG_SYNTHESIZING: &str = "Synthesizing insights...";
/// Emitted when synthesis produced a usable insight.
pub const MSG_SYNTHESIS_GENERATED: &str = "Generated synthesis insight!";
/// Emitted when a run finishes without error.
pub const MSG_COMPLETE: &str = "Analysis complete!";

/// Capacity of channels created by [`create_progress_channel`].
const PROGRESS_CHANNEL_CAPACITY: usize = 100;

/// A progress notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEvent {
    /// Identifies the run that emitted the event.
    pub run_id: String,
    /// Human-readable status message.
    pub message: String,
    /// The node being analyzed, for per-node messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
}

impl ProgressEvent {
    /// Create an event without a node tag.
    #[must_use]
    pub fn new(run_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            message: message.into(),
            node_id: None,
        }
    }

    /// Tag the event with a node id.
    #[must_use]
    pub fn with_node_id(mut self, node_id: impl Into<String>) -> Self {
        self.node_id = Some(node_id.into());
        self
    }
}

/// Callback receiving progress events.
pub type ProgressCallback = Arc<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Destination for progress events.
#[derive(Clone)]
pub enum ProgressSink {
    /// Invoke a callback inline.
    Callback(ProgressCallback),
    /// Send to every subscriber of a broadcast channel.
    Broadcast(broadcast::Sender<ProgressEvent>),
}

impl ProgressSink {
    /// Wrap a closure.
    #[must_use]
    pub fn callback<F>(f: F) -> Self
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        Self::Callback(Arc::new(f))
    }

    /// Wrap a broadcast sender.
    #[must_use]
    pub const fn broadcast(tx: broadcast::Sender<ProgressEvent>) -> Self {
        Self::Broadcast(tx)
    }

    fn deliver(&self, event: ProgressEvent) {
        match self {
            Self::Callback(f) => f(&event),
            Self::Broadcast(tx) => {
                // Best-effort send - no receivers is fine
                let _ = tx.send(event);
            }
        }
    }
}

impl fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("ProgressSink::Callback"),
            Self::Broadcast(tx) => f
                .debug_struct("ProgressSink::Broadcast")
                .field("receivers", &tx.receiver_count())
                .finish(),
        }
    }
}

/// Reports the milestones of one analysis run.
///
/// Every notification is also logged at `info`.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    run_id: String,
    sink: Option<ProgressSink>,
}

impl ProgressReporter {
    /// Create a reporter for `run_id`.
    #[must_use]
    pub fn new(run_id: impl Into<String>, sink: Option<ProgressSink>) -> Self {
        Self {
            run_id: run_id.into(),
            sink,
        }
    }

    /// A reporter that only logs.
    #[must_use]
    pub fn silent(run_id: impl Into<String>) -> Self {
        Self::new(run_id, None)
    }

    /// Get the run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit a message, optionally tagged with a node id.
    pub fn report(&self, message: &str, node_id: Option<&str>) {
        tracing::info!(run_id = %self.run_id, node_id = ?node_id, "{message}");

        if let Some(sink) = &self.sink {
            let mut event = ProgressEvent::new(self.run_id.as_str(), message);
            if let Some(id) = node_id {
                event = event.with_node_id(id);
            }
            sink.deliver(event);
        }
    }

    /// `Beginning graph analysis...`
    pub fn report_started(&self) {
        self.report(MSG_BEGIN, None);
    }

    /// `Analyzing node: {label}`, tagged with the node id.
    pub fn report_analyzing(&self, node_id: &str, label: &str) {
        self.report(&format!("Analyzing node: {label}"), Some(node_id));
    }

    /// `Found insight: {description}`
    pub fn report_insight(&self, description: &str) {
        self.report(&format!("Found insight: {description}"), None);
    }

    /// `Synthesizing insights...`
    pub fn report_synthesizing(&self) {
        self.report(MSG_SYNTHESIZING, None);
    }

    /// `Generated synthesis insight!`
    pub fn report_synthesis_generated(&self) {
        self.report(MSG_SYNTHESIS_GENERATED, None);
    }

    /// `Analysis complete!`
    pub fn report_completed(&self) {
        self.report(MSG_COMPLETE, None);
    }
}

/// Create a new broadcast channel for progress events.
///
/// Subscribers that fall more than 100 events behind miss the oldest ones.
#[must_use]
pub fn create_progress_channel() -> (
    broadcast::Sender<ProgressEvent>,
    broadcast::Receiver<ProgressEvent>,
) {
    broadcast::channel(PROGRESS_CHANNEL_CAPACITY)
}

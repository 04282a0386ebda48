//! Integration tests for graph-insights.
//!
//! These tests verify end-to-end behaviour including:
//! - Model-directed traversal over a streaming HTTP model
//! - Error propagation and malformed-output tolerance
//! - Graph file loading and merging

mod analysis_workflow;
mod error_recovery;
mod graph_loading;
mod support;

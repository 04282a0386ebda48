//! Graph Insights
//!
//! Walks a knowledge graph node by node with a locally hosted language
//! model, turning each stop into a structured insight and optionally
//! synthesizing a higher-level one at the end.
//!
//! # Features
//!
//! - Model-directed traversal with a first-unvisited fallback
//! - Tolerant parsing of the `INSIGHT / REASONING / CONFIDENCE / NODES /
//!   NEXT_NODE` response grammar
//! - Bounded runs: at most one completion per node plus one synthesis
//! - Streaming client for OpenAI-compatible local runtimes
//! - Progress notifications via callback or broadcast channel
//!
//! # Quick Start
//!
//! ```bash
//! LLM_BASE_URL=http://127.0.0.1:8080/v1 ./graph-insights analyze graph.json
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   prompt    ┌────────────────┐   SSE    ┌──────────────┐
//! │ GraphData  │────────────▶│ GraphAnalyzer  │─────────▶│ local model  │
//! │ (JSON)     │             │  (traversal)   │◀─────────│ (llama.cpp)  │
//! └────────────┘             └───────┬────────┘  tokens  └──────────────┘
//!                                    │
//!                                    ▼
//!                        Vec<GraphInsight> + progress
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod insight;
pub mod llm;
pub mod parsing;
pub mod prompts;
pub mod traits;

#[cfg(test)]
mod test_utils;

pub use analysis::{AnalysisConfig, AnalysisReport, GraphAnalyzer, ProgressEvent, ProgressSink};
pub use error::{AnalysisError, AppError, CompletionError};
pub use graph::{Edge, GraphData, Node, NodeType};
pub use insight::GraphInsight;
pub use llm::LocalModelClient;
pub use traits::CompletionClient;

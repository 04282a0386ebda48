//! Command line interface.
//!
//! ```text
//! graph-insights analyze <graph.json>... [--focus <id>]... [--domain <text>] [--format text|json]
//! ```
//!
//! Several graph files are merged in order before analysis. `--focus`
//! restricts the run to the focused nodes and their direct neighbours.

use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

use crate::analysis::{AnalysisReport, GraphAnalyzer};
use crate::config::Config;
use crate::error::AppError;
use crate::graph::GraphData;
use crate::prompts::PromptBuilder;
use crate::traits::CompletionClient;

/// Usage text printed for `help` and on parse errors.
pub const USAGE: &str = "\
Usage: graph-insights <command> [options]

Commands:
  analyze <graph.json>...   Analyze one or more graph files (merged in order)
  help                      Show this message
  version                   Show the version

Analyze options:
  -f, --focus <id>          Analyze only this node and its neighbours (repeatable)
  -d, --domain <text>       What the graph is about, used to frame prompts
      --format <text|json>  Output format (default: text)

Environment:
  LLM_BASE_URL, LLM_MODEL, LLM_API_KEY, REQUEST_TIMEOUT_MS,
  ANALYSIS_ATTEMPTS, ANALYSIS_TEMPERATURE, ANALYSIS_MAX_TOKENS,
  ANALYSIS_INSIGHT_CAP, LOG_LEVEL, LOG_FORMAT";

/// Errors from argument parsing and output rendering.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CliError {
    /// No command provided.
    #[error("No command provided")]
    MissingCommand,

    /// Unknown command.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Unknown flag.
    #[error("Unknown flag: {0}")]
    UnknownFlag(String),

    /// Missing value for a flag or positional argument.
    #[error("Missing value for {0}")]
    MissingValue(String),

    /// Invalid value for a flag.
    #[error("Invalid value '{value}' for {flag}")]
    InvalidValue {
        /// The flag with the invalid value.
        flag: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// The result could not be rendered.
    #[error("Failed to render output: {message}")]
    Output {
        /// What went wrong.
        message: String,
    },
}

/// Output rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Insight cards.
    #[default]
    Text,
    /// The full [`AnalysisReport`] as JSON.
    Json,
}

/// Arguments of `analyze`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalyzeArgs {
    /// Graph files, merged in order.
    pub graph_paths: Vec<PathBuf>,
    /// Node ids selecting a section; empty means the whole graph.
    pub focus: Vec<String>,
    /// Prompt framing override.
    pub domain: Option<String>,
    /// Output format.
    pub format: OutputFormat,
}

/// A parsed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Analyze graph files.
    Analyze(AnalyzeArgs),
    /// Print usage.
    Help,
    /// Print the version.
    Version,
}

impl Command {
    /// Parse a command from arguments, program name excluded.
    ///
    /// # Errors
    ///
    /// Returns [`CliError`] for a missing or unknown command, an unknown flag,
    /// or a flag without a valid value.
    pub fn parse(args: &[String]) -> Result<Self, CliError> {
        let Some(cmd) = args.first() else {
            return Err(CliError::MissingCommand);
        };

        match cmd.to_lowercase().as_str() {
            "analyze" => Self::parse_analyze(&args[1..]).map(Self::Analyze),
            "help" | "--help" | "-h" => Ok(Self::Help),
            "version" | "--version" | "-V" => Ok(Self::Version),
            other => Err(CliError::UnknownCommand(other.to_string())),
        }
    }

    fn parse_analyze(args: &[String]) -> Result<AnalyzeArgs, CliError> {
        let mut parsed = AnalyzeArgs::default();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--focus" | "-f" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| CliError::MissingValue("--focus".into()))?;
                    parsed.focus.push(value.clone());
                }
                "--domain" | "-d" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| CliError::MissingValue("--domain".into()))?;
                    parsed.domain = Some(value.clone());
                }
                "--format" => {
                    let value = iter
                        .next()
                        .ok_or_else(|| CliError::MissingValue("--format".into()))?;
                    parsed.format = match value.as_str() {
                        "text" => OutputFormat::Text,
                        "json" => OutputFormat::Json,
                        _ => {
                            return Err(CliError::InvalidValue {
                                flag: "--format".into(),
                                value: value.clone(),
                            })
                        }
                    };
                }
                flag if flag.starts_with('-') => {
                    return Err(CliError::UnknownFlag(flag.to_string()));
                }
                path => parsed.graph_paths.push(PathBuf::from(path)),
            }
        }

        if parsed.graph_paths.is_empty() {
            return Err(CliError::MissingValue("graph file".into()));
        }
        Ok(parsed)
    }
}

/// Load, merge and analyze the graphs named in `args`, returning rendered output.
///
/// # Errors
///
/// Returns [`AppError`] if a graph file cannot be loaded, the analysis
/// fails, or the report cannot be rendered.
pub async fn run_analyze<C: CompletionClient>(
    client: C,
    config: &Config,
    args: &AnalyzeArgs,
) -> Result<String, AppError> {
    let mut sources = Vec::with_capacity(args.graph_paths.len());
    for path in &args.graph_paths {
        sources.push(GraphData::from_path(path).await?);
    }
    let graph = GraphData::merge(sources);
    tracing::info!(
        files = args.graph_paths.len(),
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Graph loaded"
    );

    let mut analyzer = GraphAnalyzer::new(client, config.analysis_config());
    if let Some(domain) = &args.domain {
        analyzer = analyzer.with_prompts(PromptBuilder::new().with_domain(domain.as_str()));
    }

    let report = if args.focus.is_empty() {
        analyzer.analyze_report(&graph).await?
    } else {
        analyzer.analyze_report(&graph.section(&args.focus)).await?
    };

    render_report(&report, args.format)
}

/// Render a report in `format`.
///
/// # Errors
///
/// Returns [`CliError::Output`] if JSON serialization fails.
pub fn render_report(report: &AnalysisReport, format: OutputFormat) -> Result<String, AppError> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(|e| {
            AppError::from(CliError::Output {
                message: e.to_string(),
            })
        }),
        OutputFormat::Text => {
            if report.insights.is_empty() {
                return Ok("No insights found.".to_string());
            }
            let mut out = String::new();
            for (i, insight) in report.insights.iter().enumerate() {
                let _ = writeln!(out, "Insight {}\n{insight}\n", i + 1);
            }
            Ok(out.trim_end().to_string())
        }
    }
}

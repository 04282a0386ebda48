//! graph-insights binary entry point.
//!
//! Loads one or more graph files, runs the analysis against a local model
//! and prints the insights. All logs go to stderr; stdout carries only the
//! rendered result.
//!
//! Coverage is excluded because the main function needs a running model.

// Enable the coverage attribute when running with nightly for llvm-cov exclusions
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use std::process::ExitCode;

use graph_insights::cli::{run_analyze, AnalyzeArgs, Command, USAGE};
use graph_insights::config::{log_level_from_env, Config};
use graph_insights::error::AppError;
use tracing_subscriber::EnvFilter;

#[cfg_attr(coverage_nightly, coverage(off))]
fn init_tracing() {
    // .env is applied here so LOG_LEVEL from it reaches the subscriber
    let filter =
        EnvFilter::try_new(log_level_from_env()).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    // Logs to stderr only (stdout is for results)
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();
    }
}

#[cfg_attr(coverage_nightly, coverage(off))]
async fn run(args: &AnalyzeArgs) -> Result<String, AppError> {
    let config = Config::from_env()?;
    tracing::info!(
        base_url = %config.base_url,
        model = %config.model,
        timeout_ms = config.request_timeout_ms,
        attempts = config.attempts,
        "Configuration loaded"
    );
    let client = config.build_client()?;
    run_analyze(client, &config, args).await
}

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("error: {e}\n\n{USAGE}");
            return ExitCode::from(2);
        }
    };

    let analyze_args = match command {
        Command::Help => {
            println!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Command::Version => {
            println!("graph-insights {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Command::Analyze(analyze_args) => analyze_args,
    };

    init_tracing();

    let result = run(&analyze_args).await;

    match result {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "graph-insights failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

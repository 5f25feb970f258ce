//! lsp-peek - Entry Point
//!
//! Parses arguments, sets up logging, runs one query and maps the outcome to
//! an exit code: 0 on success (including "nothing found"), 1 on any error.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lsp_peek::cli::Cli;

/// Initializes the tracing subscriber for logging.
fn init_tracing(level: Level) -> Result<()> {
    // Create an env filter that respects RUST_LOG but has a default level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("lsp_peek={level}")));

    // Logs go to stderr; stdout only carries query results
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    Ok(())
}

async fn run(cli: Cli) -> Result<Vec<String>> {
    let log_level = cli.parse_log_level()?;
    init_tracing(log_level)?;
    cli.execute().await
}

/// Main entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help and version are printed to stdout and are not failures.
            let code = if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            let _ = err.print();
            return code;
        }
    };

    match run(cli).await {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

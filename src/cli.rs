//! Command-line surface.
//!
//! One invocation runs exactly one query: resolve the file, start the
//! language server, initialize, query, and shut the server down whether or
//! not the query succeeded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, debug, info, warn};

use crate::config::Invocation;
use crate::lsp::{LspClient, LspClientBuilder};
use crate::output::{hover_lines, location_lines};

/// Query a language server for hover, definition, or references at a position.
#[derive(Parser, Debug)]
#[command(name = "lsp-peek")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Query to run.
    #[command(subcommand)]
    pub command: Command,

    /// Language server command to use.
    #[arg(long, global = true, default_value = "gopls")]
    pub server: String,

    /// Argument to pass to the language server (repeatable).
    #[arg(long = "server-arg", global = true, allow_hyphen_values = true)]
    pub server_args: Vec<String>,

    /// Language identifier sent when opening the file.
    #[arg(long, global = true, default_value = "go")]
    pub language_id: String,

    /// Give up on a request after this many seconds (default: wait indefinitely).
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Show the language server's stderr.
    #[arg(long, global = true)]
    pub server_stderr: bool,

    /// Log level: trace, debug, info, warn, error.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

/// The supported queries.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show type information and documentation for the symbol at a position.
    #[command(visible_alias = "type")]
    Hover(PositionArgs),
    /// Find where the symbol at a position is defined.
    #[command(visible_alias = "def")]
    Definition(PositionArgs),
    /// Find every reference to the symbol at a position.
    #[command(visible_alias = "refs")]
    References(PositionArgs),
}

/// A position in a file, as shown by editors (1-indexed).
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct PositionArgs {
    /// File containing the symbol.
    pub file: PathBuf,
    /// Line number, starting at 1.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub line: u32,
    /// Column number, starting at 1.
    #[arg(value_parser = clap::value_parser!(u32).range(1..))]
    pub column: u32,
}

impl Command {
    /// The position the query targets.
    pub fn position(&self) -> &PositionArgs {
        match self {
            Self::Hover(position) | Self::Definition(position) | Self::References(position) => {
                position
            }
        }
    }
}

impl Cli {
    /// Parses the log level string into a tracing Level.
    ///
    /// ## Errors
    pub fn parse_log_level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            other => anyhow::bail!("invalid log level: {}", other),
        }
    }

    /// Client settings derived from the options, rooted at `workspace_root`.
    pub fn client_builder(&self, workspace_root: &Path) -> LspClientBuilder {
        let builder = LspClient::builder()
            .server_command(&self.server)
            .server_args(self.server_args.iter().cloned())
            .workspace_root(workspace_root)
            .language_id(&self.language_id)
            .show_server_stderr(self.server_stderr);

        match self.timeout_secs {
            Some(secs) => builder.request_timeout(Duration::from_secs(secs)),
            None => builder,
        }
    }

    /// Runs the query and returns the lines to print.
    ///
    /// The language server is shut down before returning, also when the
    /// query failed.
    /// ## Errors
    pub async fn execute(&self) -> Result<Vec<String>> {
        let position = self.command.position();
        let invocation = Invocation::resolve(&position.file)?;

        info!(
            file = %invocation.file.display(),
            workspace = %invocation.workspace_root.display(),
            server = %self.server,
            "running query"
        );

        let client = self
            .client_builder(&invocation.workspace_root)
            .start()
            .await
            .context("failed to start language server")?;

        let outcome = run_query(&client, &self.command, &invocation.file).await;

        match client.shutdown().await {
            Ok(status) => debug!(?status, "language server stopped"),
            Err(e) => warn!(error = %e, "language server shutdown failed"),
        }

        outcome
    }
}

/// Initializes the session and runs one query against it.
///
/// ## Errors
pub async fn run_query(client: &LspClient, command: &Command, file: &Path) -> Result<Vec<String>> {
    client.initialize().await?;

    let PositionArgs { line, column, .. } = *command.position();
    match command {
        Command::Hover(_) => {
            let hover = client
                .hover(file, line, column)
                .await
                .context("hover failed")?;
            Ok(hover_lines(hover.as_ref()))
        }
        Command::Definition(_) => {
            let locations = client
                .goto_definition(file, line, column)
                .await
                .context("definition lookup failed")?;
            Ok(location_lines(&locations))
        }
        Command::References(_) => {
            let locations = client
                .find_references(file, line, column, true)
                .await
                .context("references lookup failed")?;
            Ok(location_lines(&locations))
        }
    }
}

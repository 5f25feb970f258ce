//! lsp-peek
//!
//! A command-line client that asks a language server (like gopls) for hover
//! information, definitions, or references at a single file position.
//!
//! # Overview
//!
//! This library provides:
//! - A framed JSON-RPC transport over the server's stdio
//! - A session manager that correlates concurrent requests with responses
//! - Hover, definition and references queries
//! - Formatting of results into printable lines
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐              ┌─────────────────┐
//! │       CLI       │─────────────►│   LspClient     │
//! │   (lsp-peek)    │   query      │ (session, reader│
//! └─────────────────┘              │   correlator)   │
//!                                  └────────┬────────┘
//!                                           │ JSON-RPC over stdio
//!                                  ┌────────▼────────┐
//!                                  │    Language     │
//!                                  │     Server      │
//!                                  │    (gopls)      │
//!                                  └─────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`error`] - Error types for the entire application
//! - [`lsp`] - LSP session and queries
//! - [`output`] - Result formatting
//! - [`config`] - File and workspace resolution
//! - [`cli`] - Command-line surface
//!
//! # Example
//!
//! ```ignore
//! use lsp_peek::lsp::LspClient;
//! use lsp_peek::output::location_lines;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = LspClient::builder()
//!         .server_command("gopls")
//!         .workspace_root(".")
//!         .build()
//!         .await?;
//!
//!     let locations = client.goto_definition(Path::new("main.go"), 10, 5).await;
//!     client.shutdown().await?;
//!     for line in location_lines(&locations?) {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

// Enforce documentation and other quality attributes
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are too strict
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod config;
pub mod error;
pub mod lsp;
pub mod output;

// Re-export commonly used types at the crate root
pub use error::{Error, Result};

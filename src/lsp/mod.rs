//! LSP (Language Server Protocol) client module.
//!
//! This module implements the session with a language server subprocess:
//! framing, request/response correlation, the initialize/shutdown lifecycle
//! and the three position queries.
//!
//! # Architecture
//!
//! - `transport`: `Content-Length` framing over any async byte stream
//! - `message`: JSON-RPC envelopes and inbound classification
//! - `correlator`: in-flight request table and single-use response slots
//! - `client`: the session (process, background reader, handshake, shutdown)
//! - `query`: hover, definition and references
//! - `types`: position/URI conversion and decoded result shapes
//!
//! # Usage
//!
//! ```ignore
//! use lsp_peek::lsp::LspClient;
//!
//! let client = LspClient::builder()
//!     .server_command("gopls")
//!     .workspace_root("/path/to/module")
//!     .start()
//!     .await?;
//! client.initialize().await?;
//! let hover = client.hover(Path::new("/path/to/module/main.go"), 12, 5).await;
//! client.shutdown().await?;
//! ```

pub mod client;
pub mod correlator;
pub mod message;
pub mod query;
pub mod transport;
pub mod types;

use crate::error::LspError;

/// Result type for LSP operations.
pub type LspResult<T> = std::result::Result<T, LspError>;

pub use client::{LspClient, LspClientBuilder, LspClientConfig};
pub use lsp_types::{Location, Position, Url};

//! Error types for lsp-peek.
//!
//! Errors are organized by layer: the framed transport underneath, the
//! language server session on top of it, and a crate-wide [`Error`] that the
//! command-line surface converts into a one-line diagnostic.

use thiserror::Error;

/// Errors raised while reading or writing `Content-Length` framed messages.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The stream ended cleanly before a new frame started.
    #[error("connection closed")]
    ConnectionClosed,

    /// The stream ended in the middle of a header block.
    #[error("connection closed while reading frame header")]
    IncompleteHeader,

    /// The stream ended before the announced payload was read.
    #[error("connection closed while reading frame payload of {expected} bytes")]
    IncompletePayload {
        /// The length announced by `Content-Length`.
        expected: usize,
    },

    /// A header line ran past the accepted length without a line break.
    #[error("header line exceeds {max} bytes")]
    HeaderTooLong {
        /// The longest accepted header line.
        max: usize,
    },

    /// The header block had no `Content-Length` header.
    #[error("missing Content-Length header")]
    MissingContentLength,

    /// The `Content-Length` value was not a non-negative integer.
    #[error("invalid Content-Length header: {0}")]
    InvalidContentLength(String),

    /// The announced payload exceeds the accepted maximum.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// The announced payload size.
        size: usize,
        /// The largest accepted payload size.
        max: usize,
    },

    /// The write half has already been closed.
    #[error("writer is closed")]
    WriterClosed,

    /// IO error during transport operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to the language server session.
#[derive(Debug, Error)]
pub enum LspError {
    /// The language server process failed to start.
    #[error("failed to start language server: {0}")]
    ServerStartFailed(String),

    /// The language server stopped answering: its output closed, the
    /// transport failed, or the session was closed.
    #[error("language server exited unexpectedly: {0}")]
    ServerExited(String),

    /// Failed to initialize the language server.
    #[error("language server initialization failed: {0}")]
    InitializationFailed(String),

    /// The language server returned an error response.
    #[error("language server error: {message} (code: {code})")]
    ServerError {
        /// The error code from the language server.
        code: i64,
        /// The error message from the language server.
        message: String,
    },

    /// A request to the language server timed out.
    #[error("language server request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// Failed to send a request to the language server.
    #[error("failed to send request to language server: {0}")]
    RequestFailed(String),

    /// Failed to parse the response from the language server.
    #[error("failed to parse language server response: {0}")]
    ParseError(String),

    /// Invalid position in document.
    #[error("invalid position: line {line}, column {column}")]
    InvalidPosition {
        /// The line number.
        line: u32,
        /// The column number.
        column: u32,
    },

    /// Document not found or unreadable.
    #[error("document not found: {0}")]
    DocumentNotFound(String),

    /// Waiting for the language server process failed.
    #[error("failed to wait for language server: {0}")]
    ProcessWait(std::io::Error),

    /// The framed transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

/// A unified error type for the entire application.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Generic IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A specialized Result type for lsp-peek operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Additional type definitions for LSP operations.
//!
//! Position and URI conversions between the 1-indexed, path-based view the
//! command line uses and the 0-indexed, URI-based view on the wire, plus the
//! decoded shapes of hover and location results.

use lsp_types::{GotoDefinitionResponse, Location, Position, Url};
use serde::Deserialize;
use std::path::Path;

use crate::error::LspError;

use super::LspResult;

/// Converts a path to an LSP file:// URI.
///
/// Relative paths are resolved against the current directory and symlinks
/// are resolved, so the server sees the same URI for the same file.
/// ## Errors
pub fn path_to_url(path: &Path) -> LspResult<Url> {
    // Make path absolute
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| {
                LspError::DocumentNotFound(format!("failed to get current directory: {e}"))
            })?
            .join(path)
    };

    let canonical = absolute.canonicalize().map_err(|e| {
        LspError::DocumentNotFound(format!(
            "failed to canonicalize path '{}': {}",
            path.display(),
            e
        ))
    })?;

    // Use Url::from_file_path which handles platform-specific details
    Url::from_file_path(&canonical)
        .map_err(|()| LspError::DocumentNotFound(format!("invalid path: {}", canonical.display())))
}

/// Renders a location URI the way a user would type the path.
///
/// `file://` URIs become plain (percent-decoded) paths; anything else is shown
/// with a leading `file://` stripped if present, else verbatim.
pub fn display_path(uri: &Url) -> String {
    if uri.scheme() == "file"
        && let Ok(path) = uri.to_file_path()
    {
        return path.display().to_string();
    }
    let raw = uri.as_str();
    raw.strip_prefix("file://").unwrap_or(raw).to_string()
}

/// Converts user-facing 1-indexed position to LSP 0-indexed position.
///
/// # Arguments
///
/// * `line` - 1-indexed line number
/// * `column` - 1-indexed column number
///
/// # Returns
///
/// LSP Position (0-indexed)
///
/// # Errors
///
/// Returns error if line or column is 0.
pub fn to_lsp_position(line: u32, column: u32) -> LspResult<Position> {
    if line == 0 || column == 0 {
        return Err(LspError::InvalidPosition { line, column });
    }
    Ok(Position {
        line: line - 1,
        character: column - 1,
    })
}

/// Converts LSP 0-indexed position to user-facing 1-indexed position.
///
/// # Arguments
///
/// * `position` - LSP Position (0-indexed)
///
/// # Returns
///
/// Tuple of (line, column) both 1-indexed
pub fn from_lsp_position(position: Position) -> (u32, u32) {
    (
        position.line.saturating_add(1),
        position.character.saturating_add(1),
    )
}

/// Flattens every shape a definition result can take into plain locations.
///
/// Links point at their target; the selection range is used because it
/// covers the symbol name rather than the whole declaration.
pub fn definition_locations(response: GotoDefinitionResponse) -> Vec<Location> {
    match response {
        GotoDefinitionResponse::Scalar(loc) => vec![loc],
        GotoDefinitionResponse::Array(locs) => locs,
        GotoDefinitionResponse::Link(links) => links
            .into_iter()
            .map(|link| Location {
                uri: link.target_uri,
                range: link.target_selection_range,
            })
            .collect(),
    }
}

/// Result of a `textDocument/hover` request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HoverResult {
    /// Hover contents; missing or `null` means nothing to show.
    #[serde(default)]
    pub contents: Option<HoverContents>,
}

/// The shapes servers use for hover contents.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HoverContents {
    /// A bare string.
    Text(String),
    /// A sequence of strings and tagged objects.
    ///
    /// Listed before `Tagged` so arrays never decode as a struct.
    List(Vec<HoverItem>),
    /// An object carrying a `value` (`MarkupContent` or a language string).
    Tagged(TaggedContent),
}

/// One entry of a hover content list.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HoverItem {
    /// A bare string.
    Text(String),
    /// An object carrying a `value`.
    Tagged(TaggedContent),
}

/// Hover text with its optional markup kind or language.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TaggedContent {
    /// The text.
    pub value: String,
    /// `plaintext` or `markdown` for `MarkupContent`.
    #[serde(default)]
    pub kind: Option<String>,
    /// Language of a `MarkedString` code block.
    #[serde(default)]
    pub language: Option<String>,
}

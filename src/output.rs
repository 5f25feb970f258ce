//! Formatting of query results into display lines.
//!
//! Pure functions only: every query result is turned into a list of lines the
//! binary prints one per row. Empty results produce an explicit message so a
//! query that found nothing is distinguishable from one that printed nothing.

use lsp_types::Location;

use crate::lsp::types::{
    HoverContents, HoverItem, HoverResult, TaggedContent, display_path, from_lsp_position,
};

/// Printed when the server has no hover information at the position.
pub const NO_HOVER: &str = "no hover information";

/// Printed when a definition or references query found nothing.
pub const NO_LOCATIONS: &str = "no locations found";

/// Normalizes a hover result to display entries, one per content item.
pub fn hover_lines(hover: Option<&HoverResult>) -> Vec<String> {
    let entries: Vec<String> = match hover.and_then(|h| h.contents.as_ref()) {
        None => Vec::new(),
        Some(HoverContents::Text(text)) => vec![text.clone()],
        Some(HoverContents::Tagged(tagged)) => vec![tagged_text(tagged)],
        Some(HoverContents::List(items)) => items
            .iter()
            .map(|item| match item {
                HoverItem::Text(text) => text.clone(),
                HoverItem::Tagged(tagged) => tagged_text(tagged),
            })
            .collect(),
    };

    let entries: Vec<String> = entries
        .into_iter()
        .filter(|entry| !entry.trim().is_empty())
        .collect();

    if entries.is_empty() {
        vec![NO_HOVER.to_string()]
    } else {
        entries
    }
}

fn tagged_text(tagged: &TaggedContent) -> String {
    strip_code_fences(&tagged.value).to_string()
}

/// Unwraps a markdown code block: drops a leading ```` ``` ```` line (with an
/// optional language tag) and a trailing ```` ``` ```` line.
///
/// This is cosmetic; everything between the fences is returned untouched.
pub fn strip_code_fences(value: &str) -> &str {
    let mut text = value;

    if let Some(rest) = text.strip_prefix("```")
        && let Some((tag, body)) = rest.split_once('\n')
        && is_fence_tag(tag.trim_end_matches('\r'))
    {
        text = body;
    }

    let trimmed = text.trim_end_matches(['\n', '\r']);
    if let Some(body) = trimmed.strip_suffix("```") {
        if body.is_empty() {
            return body;
        }
        if let Some(body) = body.strip_suffix('\n') {
            return body.strip_suffix('\r').unwrap_or(body);
        }
    }

    text
}

fn is_fence_tag(tag: &str) -> bool {
    tag.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '+' | '.' | '#'))
}

/// One `path:line:col` line per location, 1-indexed.
pub fn location_lines(locations: &[Location]) -> Vec<String> {
    if locations.is_empty() {
        return vec![NO_LOCATIONS.to_string()];
    }

    locations.iter().map(format_location).collect()
}

/// Formats a single location as `path:line:col`.
pub fn format_location(location: &Location) -> String {
    let (line, column) = from_lsp_position(location.range.start);
    format!("{}:{}:{}", display_path(&location.uri), line, column)
}

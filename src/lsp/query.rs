//! Position queries: hover, go to definition, find references.
//!
//! Each query validates the 1-indexed position, opens the document, and then
//! issues exactly one request. Positions are checked first so an invalid
//! position never reaches the server.

use std::path::Path;

use lsp_types::{
    GotoDefinitionParams, GotoDefinitionResponse, HoverParams, Location, PartialResultParams,
    Position, ReferenceContext, ReferenceParams, TextDocumentIdentifier,
    TextDocumentPositionParams, Url, WorkDoneProgressParams,
};

use super::LspResult;
use super::client::LspClient;
use super::types::{HoverResult, definition_locations, to_lsp_position};

fn position_params(uri: Url, position: Position) -> TextDocumentPositionParams {
    TextDocumentPositionParams {
        text_document: TextDocumentIdentifier { uri },
        position,
    }
}

impl LspClient {
    /// Gets hover information for the symbol at the given position.
    ///
    /// `Ok(None)` means the server had nothing to show.
    /// ## Errors
    pub async fn hover(&self, path: &Path, line: u32, column: u32) -> LspResult<Option<HoverResult>> {
        let position = to_lsp_position(line, column)?;
        let uri = self.did_open(path).await?;

        let params = HoverParams {
            text_document_position_params: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
        };

        self.request("textDocument/hover", params).await
    }

    /// Gets the definition location(s) for the symbol at the given position.
    ///
    /// Every result shape is flattened to plain locations; `null` becomes an
    /// empty list.
    /// ## Errors
    pub async fn goto_definition(
        &self,
        path: &Path,
        line: u32,
        column: u32,
    ) -> LspResult<Vec<Location>> {
        let position = to_lsp_position(line, column)?;
        let uri = self.did_open(path).await?;

        let params = GotoDefinitionParams {
            text_document_position_params: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
        };

        let response: Option<GotoDefinitionResponse> =
            self.request("textDocument/definition", params).await?;
        Ok(response.map(definition_locations).unwrap_or_default())
    }

    /// Finds all references to the symbol at the given position.
    /// ## Errors
    pub async fn find_references(
        &self,
        path: &Path,
        line: u32,
        column: u32,
        include_declaration: bool,
    ) -> LspResult<Vec<Location>> {
        let position = to_lsp_position(line, column)?;
        let uri = self.did_open(path).await?;

        let params = ReferenceParams {
            text_document_position: position_params(uri, position),
            work_done_progress_params: WorkDoneProgressParams::default(),
            partial_result_params: PartialResultParams::default(),
            context: ReferenceContext {
                include_declaration,
            },
        };

        let response: Option<Vec<Location>> =
            self.request("textDocument/references", params).await?;
        Ok(response.unwrap_or_default())
    }
}

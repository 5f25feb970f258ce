//! Resolution of a command-line invocation into absolute paths.
//!
//! The file argument is made absolute before it reaches the language server,
//! and the workspace root is found by walking up to the enclosing repository.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Name of the entry that marks a repository root. It is a directory in a
/// normal checkout and a file in worktrees and submodules.
const REPOSITORY_MARKER: &str = ".git";

/// The file and workspace a query runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Absolute path of the queried file.
    pub file: PathBuf,
    /// Directory handed to the server as its root.
    pub workspace_root: PathBuf,
}

impl Invocation {
    /// Resolves `file` against the current directory and finds its workspace.
    ///
    /// ## Errors
    /// Returns [`Error::Config`] if the file does not exist or is not a
    /// regular file.
    pub fn resolve(file: &Path) -> Result<Self> {
        let absolute = if file.is_absolute() {
            file.to_path_buf()
        } else {
            std::env::current_dir()?.join(file)
        };

        let file = absolute.canonicalize().map_err(|e| {
            Error::Config(format!("cannot access '{}': {}", file.display(), e))
        })?;
        if !file.is_file() {
            return Err(Error::Config(format!(
                "'{}' is not a regular file",
                file.display()
            )));
        }

        let directory = file
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| Error::Config(format!("'{}' has no parent directory", file.display())))?;
        let workspace_root = find_workspace_root(&directory).unwrap_or(directory);

        Ok(Self {
            file,
            workspace_root,
        })
    }
}

/// Returns the nearest ancestor of `start` (inclusive) that contains `.git`.
pub fn find_workspace_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(REPOSITORY_MARKER).exists())
        .map(Path::to_path_buf)
}

use std::path::{Path, PathBuf};

use lsp_peek::lsp::{LspClient, LspClientConfig};
use tempfile::TempDir;

use super::fake_server::FakeServer;
use super::pipe::pipe;

/// Represents a test fixture with files and a cursor position.
#[derive(Debug)]
pub struct Fixture {
    /// files in fixture
    pub files: Vec<(PathBuf, String)>,
    /// Position of cursor in fixture (1-indexed line and column)
    pub cursor: (PathBuf, u32, u32),
}

/// Parses a fixture into file contents and paths.
///
/// `//- path` starts a new file; `$0` marks the cursor and is removed.
/// ## Panics
/// if input is malformed or cursor is not found
pub fn parse_fixture(input: &str) -> Fixture {
    let mut files = Vec::new();
    let mut current_path: Option<PathBuf> = None;
    let mut current_content = String::new();
    let mut cursor = None;

    for line in input.lines() {
        if let Some(path) = line.strip_prefix("//- ") {
            if let Some(p) = current_path.take() {
                files.push((p, std::mem::take(&mut current_content)));
            }
            current_content.clear();
            current_path = Some(PathBuf::from(path.trim_start_matches('/')));
        } else {
            let mut l = line.to_string();
            if let Some(idx) = l.find("$0") {
                let line_no = u32::try_from(current_content.lines().count() + 1)
                    .expect("line count out of range");
                let col = u32::try_from(idx + 1).expect("line index out of range");
                let path = current_path.clone().expect("cursor outside of a file");
                cursor = Some((path, line_no, col));
                l = l.replace("$0", "");
            }
            current_content.push_str(&l);
            current_content.push('\n');
        }
    }

    if let Some(p) = current_path {
        files.push((p, current_content));
    }

    Fixture {
        files,
        cursor: cursor.expect("missing $0 cursor"),
    }
}

/// A throwaway repository (it has a `.git` directory) holding fixture files.
pub struct TestWorkspace {
    /// Temporary folder for the workspace
    pub root: TempDir,
    /// fixture for the workspace
    pub fixture: Fixture,
    /// Canonicalized root path (resolves symlinks like /var -> /private/var on macOS)
    canonical_root: PathBuf,
}

impl TestWorkspace {
    /// Writes the fixture files into a fresh temporary repository.
    /// ## Panics
    pub fn new(fixture: &str) -> Self {
        let root = TempDir::new().expect("Failed to create temp directory");
        let fixture = parse_fixture(fixture);

        std::fs::create_dir(root.path().join(".git")).unwrap();
        for (path, content) in &fixture.files {
            let abs = root.path().join(path);
            std::fs::create_dir_all(abs.parent().unwrap()).unwrap();
            std::fs::write(&abs, content).unwrap();
        }

        let canonical_root = root
            .path()
            .canonicalize()
            .expect("Failed to canonicalize root");

        Self {
            root,
            fixture,
            canonical_root,
        }
    }

    /// Returns the canonicalized root path
    pub fn canonical_root(&self) -> &Path {
        &self.canonical_root
    }

    /// Converts a relative path to an absolute path
    pub fn apath(&self, path: &str) -> PathBuf {
        self.canonical_root.join(path)
    }

    /// Absolute path and 1-indexed position of the `$0` cursor.
    pub fn cursor(&self) -> (PathBuf, u32, u32) {
        let (path, line, column) = &self.fixture.cursor;
        (self.canonical_root.join(path), *line, *column)
    }

    /// Contents of a fixture file as written to disk.
    /// ## Panics
    pub fn content(&self, path: &str) -> &str {
        self.fixture
            .files
            .iter()
            .find(|(p, _)| p == Path::new(path))
            .map(|(_, content)| content.as_str())
            .expect("no such fixture file")
    }

    /// Client configuration rooted at this workspace.
    pub fn config(&self) -> LspClientConfig {
        LspClientConfig {
            workspace_root: self.canonical_root.clone(),
            ..LspClientConfig::default()
        }
    }

    /// Connects a client to a fresh [`FakeServer`] over in-memory pipes.
    /// ## Panics
    pub fn connect(&self) -> (LspClient, FakeServer) {
        connect(self.config())
    }
}

/// Connects a client with `config` to a fresh [`FakeServer`].
/// ## Panics
pub fn connect(config: LspClientConfig) -> (LspClient, FakeServer) {
    let (client_out, server_in) = pipe();
    let (server_out, client_in) = pipe();
    let client = LspClient::connect(config, client_in, client_out).expect("connect client");
    (client, FakeServer::new(server_in, server_out))
}

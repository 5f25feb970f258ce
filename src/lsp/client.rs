//! LSP session management.
//!
//! An [`LspClient`] owns one language server: the child process, the write
//! half of its stdio, and a background task that reads every inbound frame.
//! Responses are routed to their waiters through the [`Correlator`];
//! server-initiated requests get a minimal reply so the server never stalls
//! waiting on us.
//!
//! # Example
//!
//! ```ignore
//! use lsp_peek::lsp::client::LspClient;
//! use std::path::Path;
//!
//! let client = LspClient::builder()
//!     .server_command("gopls")
//!     .workspace_root(Path::new("/path/to/module"))
//!     .build()
//!     .await?;
//!
//! let locations = client.goto_definition(Path::new("main.go"), 10, 5).await?;
//! client.shutdown().await?;
//! ```

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_process::{Child, Command};
use futures::io::{AsyncBufRead, AsyncWrite, BufReader};
use lsp_types::{
    ClientCapabilities, ClientInfo, DidOpenTextDocumentParams,
    DynamicRegistrationClientCapabilities, GotoCapability, HoverClientCapabilities,
    InitializeParams, MarkupKind, TextDocumentClientCapabilities, TextDocumentItem, Url,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{LspError, TransportError};

use super::LspResult;
use super::correlator::{Correlator, PendingResponse};
use super::message::{Message, Notification, Request, Response};
use super::transport::{FramedReader, FramedWriter};
use super::types::path_to_url;

type BoxedReader = Box<dyn AsyncBufRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Configuration for building an LSP client.
#[derive(Debug, Clone)]
pub struct LspClientConfig {
    /// Command to start the language server.
    pub server_command: String,
    /// Arguments to pass to the language server.
    pub server_args: Vec<String>,
    /// Root directory of the workspace.
    pub workspace_root: PathBuf,
    /// Language identifier sent with `textDocument/didOpen`.
    pub language_id: String,
    /// Upper bound on a single request; `None` waits as long as the server
    /// stays connected.
    pub request_timeout: Option<Duration>,
    /// How long to wait for the server to exit after `exit` before killing it.
    pub exit_timeout: Duration,
    /// Pass the server's stderr through instead of discarding it.
    pub show_server_stderr: bool,
}

impl Default for LspClientConfig {
    fn default() -> Self {
        Self {
            server_command: "gopls".to_string(),
            server_args: Vec::new(),
            workspace_root: PathBuf::from("."),
            language_id: "go".to_string(),
            request_timeout: None,
            exit_timeout: Duration::from_secs(10),
            show_server_stderr: false,
        }
    }
}

/// Builder for constructing an LSP client.
#[derive(Debug, Default)]
pub struct LspClientBuilder {
    config: LspClientConfig,
}

impl LspClientBuilder {
    /// Creates a new builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server command.
    #[must_use]
    pub fn server_command(mut self, command: impl Into<String>) -> Self {
        self.config.server_command = command.into();
        self
    }

    /// Sets the server arguments.
    #[must_use]
    pub fn server_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.server_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the workspace root.
    #[must_use]
    pub fn workspace_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.workspace_root = path.into();
        self
    }

    /// Sets the document language identifier.
    #[must_use]
    pub fn language_id(mut self, language_id: impl Into<String>) -> Self {
        self.config.language_id = language_id.into();
        self
    }

    /// Bounds every request by `timeout`.
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Sets the grace period granted to the server on shutdown.
    #[must_use]
    pub fn exit_timeout(mut self, timeout: Duration) -> Self {
        self.config.exit_timeout = timeout;
        self
    }

    /// Inherits the server's stderr.
    #[must_use]
    pub fn show_server_stderr(mut self, show: bool) -> Self {
        self.config.show_server_stderr = show;
        self
    }

    /// Spawns the language server and starts the background reader.
    ///
    /// The session is not initialized yet; call [`LspClient::initialize`].
    /// ## Errors
    pub async fn start(self) -> LspResult<LspClient> {
        let mut config = self.config;
        config.workspace_root = config.workspace_root.canonicalize().map_err(|e| {
            LspError::InitializationFailed(format!("failed to canonicalize workspace root: {e}"))
        })?;

        let stderr = if config.show_server_stderr {
            Stdio::inherit()
        } else {
            Stdio::null()
        };

        let mut cmd = Command::new(&config.server_command);
        cmd.args(&config.server_args)
            .current_dir(&config.workspace_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(stderr)
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            LspError::ServerStartFailed(format!(
                "failed to spawn '{}': {}",
                config.server_command, e
            ))
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| LspError::ServerStartFailed("failed to capture stdout".to_string()))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| LspError::ServerStartFailed("failed to capture stdin".to_string()))?;

        info!(
            command = %config.server_command,
            root = %config.workspace_root.display(),
            "language server started"
        );

        let mut client = LspClient::connect(config, BufReader::new(stdout), stdin)?;
        client.child = Some(child);
        Ok(client)
    }

    /// Spawns the language server and performs the initialize handshake.
    ///
    /// If the handshake fails the server is shut down before returning.
    /// ## Errors
    pub async fn build(self) -> LspResult<LspClient> {
        let client = self.start().await?;
        if let Err(e) = client.initialize().await {
            if let Err(shutdown_err) = client.shutdown().await {
                warn!(error = %shutdown_err, "shutdown after failed initialize also failed");
            }
            return Err(e);
        }
        Ok(client)
    }
}

/// A session with one language server.
pub struct LspClient {
    /// Configuration used to create this client.
    config: LspClientConfig,
    /// `file://` URI of the workspace root.
    root_uri: Url,
    /// Write half of the server's stdio.
    writer: Arc<FramedWriter<BoxedWriter>>,
    /// In-flight requests.
    correlator: Arc<Correlator>,
    /// Termination flag observed by the reader task.
    stop: watch::Sender<bool>,
    reader_task: Option<JoinHandle<()>>,
    /// The language server process, if this client spawned one.
    child: Option<Child>,
}

impl std::fmt::Debug for LspClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LspClient")
            .field("config", &self.config)
            .field("root_uri", &self.root_uri)
            .field("child", &self.child.as_ref().map(Child::id))
            .finish_non_exhaustive()
    }
}

impl LspClient {
    /// Creates a new builder for constructing an LSP client.
    pub fn builder() -> LspClientBuilder {
        LspClientBuilder::new()
    }

    /// Runs a session over an already connected byte stream pair.
    ///
    /// `reader` is the server's output and `writer` its input. Must be called
    /// from within a tokio runtime; the background reader starts immediately.
    /// ## Errors
    pub fn connect<R, W>(config: LspClientConfig, reader: R, writer: W) -> LspResult<Self>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let root_uri = Url::from_file_path(&config.workspace_root).map_err(|()| {
            LspError::InitializationFailed(format!(
                "invalid workspace root path: {}",
                config.workspace_root.display()
            ))
        })?;

        let writer: Arc<FramedWriter<BoxedWriter>> =
            Arc::new(FramedWriter::new(Box::new(writer) as BoxedWriter));
        let reader = FramedReader::new(Box::new(reader) as BoxedReader);
        let correlator = Arc::new(Correlator::new());
        let (stop, stop_rx) = watch::channel(false);

        let reader_task = tokio::spawn(read_loop(
            reader,
            Arc::clone(&writer),
            Arc::clone(&correlator),
            stop_rx,
        ));

        Ok(Self {
            config,
            root_uri,
            writer,
            correlator,
            stop,
            reader_task: Some(reader_task),
            child: None,
        })
    }

    /// The configuration this client was created with.
    pub fn config(&self) -> &LspClientConfig {
        &self.config
    }

    /// `file://` URI of the workspace root.
    pub fn root_uri(&self) -> &Url {
        &self.root_uri
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_requests(&self) -> usize {
        self.correlator.pending_count().await
    }

    /// Performs the `initialize` / `initialized` handshake.
    ///
    /// Returns the raw `initialize` result.
    /// ## Errors
    pub async fn initialize(&self) -> LspResult<Value> {
        #[allow(deprecated)]
        let params = InitializeParams {
            process_id: None,
            root_uri: Some(self.root_uri.clone()),
            capabilities: client_capabilities(),
            client_info: Some(ClientInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            ..Default::default()
        };

        let result: Value = self
            .request("initialize", params)
            .await
            .map_err(|e| LspError::InitializationFailed(e.to_string()))?;

        if let Some(server) = result.get("serverInfo") {
            let (name, version) = server_identity(server);
            info!(
                server_name = name,
                server_version = version,
                "language server initialized"
            );
        }

        self.notify("initialized", Some(serde_json::json!({})))
            .await
            .map_err(|e| LspError::InitializationFailed(format!("initialized notification failed: {e}")))?;

        Ok(result)
    }

    /// Opens a document in the language server.
    ///
    /// Sends `textDocument/didOpen` with the file's full text as version 1 and
    /// returns the document URI.
    /// ## Errors
    pub async fn did_open(&self, path: &Path) -> LspResult<Url> {
        let uri = path_to_url(path)?;

        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            LspError::DocumentNotFound(format!("failed to read '{}': {}", path.display(), e))
        })?;

        let params = DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: self.config.language_id.clone(),
                version: 1,
                text,
            },
        };

        self.notify("textDocument/didOpen", Some(to_params(params)?))
            .await?;
        Ok(uri)
    }

    /// Sends a request and waits for its response.
    ///
    /// The waiter is registered before the request is written, so a fast
    /// response can never be missed.
    /// ## Errors
    pub async fn request<P, R>(&self, method: &str, params: P) -> LspResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let params = to_params(params)?;
        let id = self.correlator.next_id();
        let pending = self.correlator.register(id).await?;

        debug!(id, method, "sending request");
        if let Err(e) = self.send(&Request::new(id, method, params)).await {
            self.correlator.cancel(id).await;
            return Err(e);
        }

        let response = self.wait(pending).await?;
        if let Some(error) = response.error {
            return Err(LspError::ServerError {
                code: error.code,
                message: error.message,
            });
        }

        serde_json::from_value(response.result)
            .map_err(|e| LspError::ParseError(format!("{method}: {e}")))
    }

    /// Sends a notification.
    /// ## Errors
    pub async fn notify(&self, method: &str, params: Option<Value>) -> LspResult<()> {
        debug!(method, "sending notification");
        self.send(&Notification::new(method, params)).await
    }

    /// Shuts the session down and reaps the server process.
    ///
    /// Sends `shutdown` without waiting for its reply, then `exit`, stops the
    /// reader and closes the server's input. A server that has not exited
    /// within the configured grace period is killed. Send failures are logged
    /// and do not abort the sequence.
    ///
    /// Returns the server's exit status when this client spawned it.
    /// ## Errors
    pub async fn shutdown(mut self) -> LspResult<Option<ExitStatus>> {
        debug!("shutting down language server");

        let id = self.correlator.next_id();
        if let Err(e) = self.send(&Request::new(id, "shutdown", Value::Null)).await {
            warn!(error = %e, "failed to send shutdown request");
        }
        if let Err(e) = self.notify("exit", None).await {
            warn!(error = %e, "failed to send exit notification");
        }

        self.stop.send_replace(true);
        if let Err(e) = self.writer.close().await {
            debug!(error = %e, "failed to close server input");
        }

        let status = match self.child.take() {
            Some(child) => Some(reap(child, self.config.exit_timeout).await?),
            None => None,
        };

        if let Some(task) = self.reader_task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "reader task failed");
        }

        Ok(status)
    }

    async fn send<T: Serialize>(&self, message: &T) -> LspResult<()> {
        let payload = serde_json::to_vec(message)
            .map_err(|e| LspError::RequestFailed(format!("failed to encode message: {e}")))?;
        trace!(payload = %String::from_utf8_lossy(&payload), "sending message");
        self.writer.write_message(&payload).await?;
        Ok(())
    }

    async fn wait(&self, pending: PendingResponse) -> LspResult<Response> {
        let Some(limit) = self.config.request_timeout else {
            return pending.wait().await;
        };

        let id = pending.id();
        match tokio::time::timeout(limit, pending.wait()).await {
            Ok(result) => result,
            Err(_) => {
                self.correlator.cancel(id).await;
                Err(LspError::Timeout(limit))
            }
        }
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        self.stop.send_replace(true);
        if let Some(task) = self.reader_task.take() {
            task.abort();
        }
    }
}

fn to_params<P: Serialize>(params: P) -> LspResult<Value> {
    serde_json::to_value(params)
        .map_err(|e| LspError::RequestFailed(format!("failed to encode params: {e}")))
}

/// Name and version from an `initialize` result's `serverInfo`.
fn server_identity(server_info: &Value) -> (&str, &str) {
    let field = |key: &str| {
        server_info
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or("unknown")
    };
    (field("name"), field("version"))
}

fn client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        text_document: Some(TextDocumentClientCapabilities {
            hover: Some(HoverClientCapabilities {
                dynamic_registration: Some(false),
                content_format: Some(vec![MarkupKind::PlainText, MarkupKind::Markdown]),
            }),
            definition: Some(GotoCapability {
                dynamic_registration: Some(false),
                link_support: Some(true),
            }),
            references: Some(DynamicRegistrationClientCapabilities {
                dynamic_registration: Some(false),
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

async fn reap(mut child: Child, grace: Duration) -> LspResult<ExitStatus> {
    match tokio::time::timeout(grace, child.status()).await {
        Ok(status) => status.map_err(LspError::ProcessWait),
        Err(_) => {
            warn!(?grace, "language server did not exit in time, killing it");
            if let Err(e) = child.kill() {
                debug!(error = %e, "kill failed");
            }
            child.status().await.map_err(LspError::ProcessWait)
        }
    }
}

/// Reads frames until the stream ends, the transport fails or the session
/// asks it to stop. Every pending waiter is failed on the way out.
async fn read_loop(
    mut reader: FramedReader<BoxedReader>,
    writer: Arc<FramedWriter<BoxedWriter>>,
    correlator: Arc<Correlator>,
    mut stop: watch::Receiver<bool>,
) {
    let reason = loop {
        if *stop.borrow() {
            break "session closed".to_string();
        }

        let frame = tokio::select! {
            changed = stop.changed() => {
                if changed.is_err() {
                    break "session dropped".to_string();
                }
                continue;
            }
            frame = reader.read_message() => frame,
        };

        match frame {
            Ok(payload) => dispatch(&payload, &writer, &correlator).await,
            Err(TransportError::ConnectionClosed) => {
                break "language server closed its output".to_string();
            }
            Err(e) => {
                warn!(error = %e, "transport failed");
                break e.to_string();
            }
        }
    };

    debug!(%reason, "reader stopped");
    correlator.fail_all(&reason).await;
}

async fn dispatch(
    payload: &[u8],
    writer: &Arc<FramedWriter<BoxedWriter>>,
    correlator: &Correlator,
) {
    trace!(payload = %String::from_utf8_lossy(payload), "received message");

    match Message::decode(payload) {
        Ok(Message::Response(response)) => {
            correlator.deliver(response).await;
        }
        Ok(Message::Request(request)) => answer_server_request(request, writer),
        Ok(Message::Notification(notification)) => log_notification(&notification),
        Err(e) => warn!(error = %e, "skipping undecodable message"),
    }
}

/// Replies to a server-initiated request with an empty result.
///
/// `workspace/configuration` gets one `null` per requested item, which
/// servers read as "use your defaults". The reply is written from its own
/// task: the reader must keep draining the server even while a caller holds
/// the writer.
fn answer_server_request(request: Request, writer: &Arc<FramedWriter<BoxedWriter>>) {
    debug!(id = %request.id, method = %request.method, "answering server request");

    let result = if request.method == "workspace/configuration" {
        let items = request
            .params
            .get("items")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Value::Array(vec![Value::Null; items])
    } else {
        Value::Null
    };

    let reply = Response::ok(request.id, result);
    let payload = match serde_json::to_vec(&reply) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "failed to encode reply");
            return;
        }
    };

    let writer = Arc::clone(writer);
    tokio::spawn(async move {
        if let Err(e) = writer.write_message(&payload).await {
            debug!(error = %e, "failed to answer server request");
        }
    });
}

fn log_notification(notification: &Notification) {
    let message = notification
        .params
        .as_ref()
        .and_then(|p| p.get("message"))
        .and_then(Value::as_str);

    match (notification.method.as_str(), message) {
        ("window/logMessage" | "window/showMessage", Some(message)) => {
            debug!(method = %notification.method, message, "server message");
        }
        _ => trace!(method = %notification.method, "ignoring notification"),
    }
}

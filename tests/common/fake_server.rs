//! A scripted language server speaking the real framing.
//!
//! Tests drive it step by step next to the client, usually with
//! `tokio::join!`, and assert on every message the client puts on the wire.

use std::time::Duration;

use futures::io::AsyncBufRead;
use lsp_peek::error::TransportError;
use lsp_peek::lsp::transport::{FramedReader, FramedWriter};
use serde_json::{Value, json};

use super::pipe::PipeWriter;

/// How long the fake server waits for the client before failing the test.
const RECV_TIMEOUT: Duration = Duration::from_secs(5);

type ServerInput = Box<dyn AsyncBufRead + Send + Unpin>;

/// Server side of an in-memory session.
pub struct FakeServer {
    reader: FramedReader<ServerInput>,
    writer: FramedWriter<PipeWriter>,
}

impl FakeServer {
    /// Wraps the server's input (client output) and output (client input).
    pub fn new(input: impl AsyncBufRead + Send + Unpin + 'static, output: PipeWriter) -> Self {
        Self {
            reader: FramedReader::new(Box::new(input) as ServerInput),
            writer: FramedWriter::new(output),
        }
    }

    /// Next message from the client, or `None` once the client closed its
    /// output.
    /// ## Panics
    pub async fn try_recv(&mut self) -> Option<Value> {
        let frame = tokio::time::timeout(RECV_TIMEOUT, self.reader.read_message())
            .await
            .expect("timed out waiting for the client");
        match frame {
            Ok(payload) => Some(serde_json::from_slice(&payload).expect("client sent invalid JSON")),
            Err(TransportError::ConnectionClosed) => None,
            Err(e) => panic!("transport error on server side: {e}"),
        }
    }

    /// Next message from the client.
    /// ## Panics
    pub async fn recv(&mut self) -> Value {
        self.try_recv().await.expect("client closed the connection")
    }

    /// Reads the next message and checks it is a request for `method`.
    /// ## Panics
    pub async fn expect_request(&mut self, method: &str) -> Value {
        let message = self.recv().await;
        assert_eq!(message["jsonrpc"], "2.0");
        assert_eq!(message["method"], method, "unexpected message: {message}");
        assert!(
            message.get("id").is_some_and(|id| !id.is_null()),
            "expected a request, got {message}"
        );
        message
    }

    /// Reads the next message and checks it is a notification for `method`.
    /// ## Panics
    pub async fn expect_notification(&mut self, method: &str) -> Value {
        let message = self.recv().await;
        assert_eq!(message["jsonrpc"], "2.0");
        assert_eq!(message["method"], method, "unexpected message: {message}");
        assert!(message.get("id").is_none(), "expected a notification, got {message}");
        message
    }

    /// Sends a raw JSON value as one frame.
    /// ## Panics
    pub async fn send(&self, message: Value) {
        let payload = serde_json::to_vec(&message).expect("serialize");
        self.send_payload(&payload).await;
    }

    /// Sends arbitrary bytes as one frame.
    /// ## Panics
    pub async fn send_payload(&self, payload: &[u8]) {
        self.writer
            .write_message(payload)
            .await
            .expect("client input closed");
    }

    /// Answers request `id` with `result`.
    pub async fn respond(&self, id: &Value, result: Value) {
        self.send(json!({"jsonrpc": "2.0", "id": id, "result": result}))
            .await;
    }

    /// Answers request `id` with an error.
    pub async fn respond_error(&self, id: &Value, code: i64, message: &str) {
        self.send(json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": {"code": code, "message": message}
        }))
        .await;
    }

    /// Serves `initialize` and waits for `initialized`.
    ///
    /// Returns the `initialize` request as received.
    pub async fn handshake(&mut self) -> Value {
        let request = self.expect_request("initialize").await;
        self.respond(
            &request["id"],
            json!({
                "capabilities": {
                    "hoverProvider": true,
                    "definitionProvider": true,
                    "referencesProvider": true
                },
                "serverInfo": {"name": "fake-ls", "version": "0.0.1"}
            }),
        )
        .await;

        let initialized = self.expect_notification("initialized").await;
        assert_eq!(initialized["params"], json!({}));
        request
    }

    /// Expects `shutdown`, then `exit`, then the client closing its output.
    ///
    /// Returns the shutdown request.
    pub async fn expect_shutdown(&mut self) -> Value {
        let shutdown = self.expect_request("shutdown").await;
        self.expect_notification("exit").await;
        assert_eq!(self.try_recv().await, None, "client kept writing after exit");
        shutdown
    }

    /// Closes the server's output; the client sees end of stream.
    pub async fn close(self) {
        self.writer.close().await.expect("close server output");
    }
}

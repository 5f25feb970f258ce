//! JSON-RPC 2.0 envelopes.
//!
//! Outbound messages are built from [`Request`] and [`Notification`].
//! Inbound frames are decoded with [`Message::decode`], which classifies them
//! by the presence of `id` and `method`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC protocol version sent with every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// A request expecting a response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Request identifier, unique within the session.
    pub id: Value,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// Creates a request with a numeric id.
    pub fn new(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Value::from(id),
            method: method.into(),
            params,
        }
    }
}

/// A message that expects no response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Method name.
    pub method: String,
    /// Method parameters, omitted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl Notification {
    /// Creates a notification.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseError {
    /// Error code.
    pub code: i64,
    /// Error message.
    pub message: String,
    /// Optional additional data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A response to a request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Identifier of the request this answers.
    pub id: Value,
    /// Result, `null` when absent.
    #[serde(default)]
    pub result: Value,
    /// Error, present if the request failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResponseError>,
}

impl Response {
    /// Creates a successful response.
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result,
            error: None,
        }
    }

    /// Returns the id as the numeric form this client issues.
    pub fn numeric_id(&self) -> Option<u64> {
        self.id.as_u64()
    }
}

/// Any inbound JSON-RPC message.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    /// Server-to-client request.
    Request(Request),
    /// Server-to-client notification.
    Notification(Notification),
    /// Response to one of our requests.
    Response(Response),
}

/// Superset of all envelope fields, used for classification.
#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    jsonrpc: Option<String>,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ResponseError>,
}

impl Message {
    /// Decodes and classifies one frame payload.
    ///
    /// A message with `method` and a non-null `id` is a request, with
    /// `method` and no `id` a notification, and anything else a response.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the payload is not a JSON-RPC object.
    pub fn decode(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let raw: RawMessage = serde_json::from_slice(payload)?;
        let jsonrpc = raw
            .jsonrpc
            .unwrap_or_else(|| JSONRPC_VERSION.to_string());
        let id = raw.id.filter(|id| !id.is_null());

        let message = match (raw.method, id) {
            (Some(method), Some(id)) => Self::Request(Request {
                jsonrpc,
                id,
                method,
                params: raw.params.unwrap_or(Value::Null),
            }),
            (Some(method), None) => Self::Notification(Notification {
                jsonrpc,
                method,
                params: raw.params,
            }),
            (None, id) => Self::Response(Response {
                jsonrpc,
                id: id.unwrap_or(Value::Null),
                result: raw.result.unwrap_or(Value::Null),
                error: raw.error,
            }),
        };

        Ok(message)
    }
}

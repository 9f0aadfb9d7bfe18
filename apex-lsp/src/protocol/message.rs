// Typed view of JSON-RPC traffic. Inbound bodies are classified into
// requests, notifications and client responses; outbound messages are
// assembled as JSON values and framed by the writer.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// JSON-RPC error codes used by the server.
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_NOT_INITIALIZED: i64 = -32002;
    pub const REQUEST_CANCELLED: i64 = -32800;
}

/// Request ids are integers or strings; equality follows the JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestId::Number(n) => write!(f, "{n}"),
            RequestId::String(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone)]
pub enum Message {
    Request {
        id: RequestId,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    /// A successful response from the client to a server-initiated request.
    ClientResponse { id: RequestId, result: Value },
    /// An error response from the client to a server-initiated request.
    ClientError { id: RequestId, error: Value },
    /// Synthesized when a body was not valid JSON or not a JSON-RPC shape.
    ParseError { id: Option<RequestId> },
}

/// Classify one frame body. `None` means the body was a response without
/// an id, which is dropped silently.
pub fn classify(body: &[u8]) -> Option<Message> {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return Some(Message::ParseError { id: None });
    };
    let Some(object) = value.as_object() else {
        return Some(Message::ParseError { id: None });
    };

    let id = object.get("id").and_then(parse_id);

    match object.get("method").and_then(Value::as_str) {
        Some(method) => {
            let params = object.get("params").cloned().unwrap_or(Value::Null);
            match id {
                Some(id) => Some(Message::Request {
                    id,
                    method: method.to_string(),
                    params,
                }),
                None => Some(Message::Notification {
                    method: method.to_string(),
                    params,
                }),
            }
        }
        None => {
            let Some(id) = id else {
                // A response we cannot correlate; drop it.
                return None;
            };
            if let Some(error) = object.get("error") {
                Some(Message::ClientError {
                    id,
                    error: error.clone(),
                })
            } else if let Some(result) = object.get("result") {
                Some(Message::ClientResponse {
                    id,
                    result: result.clone(),
                })
            } else {
                Some(Message::ParseError { id: Some(id) })
            }
        }
    }
}

fn parse_id(value: &Value) -> Option<RequestId> {
    match value {
        Value::Number(n) => n.as_i64().map(RequestId::Number),
        Value::String(s) => Some(RequestId::String(s.clone())),
        _ => None,
    }
}

pub fn response_ok(id: &RequestId, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

pub fn response_error(id: Option<&RequestId>, code: i64, message: &str) -> Value {
    let id = match id {
        Some(id) => json!(id),
        None => Value::Null,
    };
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": code, "message": message },
    })
}

pub fn notification(method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "method": method, "params": params })
}

/// A server-to-client request. Server-side ids live in their own number
/// space and never collide with client ids.
pub fn server_request(id: i64, method: &str, params: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params })
}

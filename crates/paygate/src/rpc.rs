use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::JSONRPC_VERSION;
use crate::error::RpcError;

/// A decoded JSON-RPC call. Fields are kept as raw JSON so that a call with
/// an odd `method` or `params` still routes (and fails) the way callers expect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RpcCall {
    #[serde(default)]
    pub method: Value,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
    /// Credential supplied alongside the call instead of in `params`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<Value>,
}

impl RpcCall {
    pub fn new(method: &str, params: Vec<Value>, id: impl Into<Value>) -> Self {
        Self {
            method: Value::String(method.to_string()),
            params: Value::Array(params),
            id: id.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Value::String(token.into()));
        self
    }

    /// Decode a request body. Anything other than a JSON object is a parse error.
    pub fn parse(body: &[u8]) -> Result<Self, RpcError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| RpcError::Parse)?;
        if !value.is_object() {
            return Err(RpcError::Parse);
        }
        serde_json::from_value(value).map_err(|_| RpcError::Parse)
    }

    pub fn method_name(&self) -> Option<&str> {
        self.method.as_str()
    }
}

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl From<&RpcError> for RpcErrorObject {
    fn from(e: &RpcError) -> Self {
        Self {
            code: e.code(),
            message: e.message(),
        }
    }
}

/// JSON-RPC 2.0 response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorObject>,
    pub id: Value,
}

impl RpcResponse {
    pub fn success(result: Value, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(error: &RpcError, id: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(error.into()),
            id,
        }
    }
}

/// What the transport sends back: an HTTP status and a response body, plus
/// labels for metrics that never reach the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcReply {
    pub status: u16,
    pub body: RpcResponse,
    /// Routed method, `"unknown"` for unrecognized names, `"invalid"` for unparseable bodies.
    pub method: &'static str,
    /// Internal rejection reason, finer than the caller-visible message.
    pub reason: Option<&'static str>,
}

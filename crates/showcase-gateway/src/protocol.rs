//! Gateway RPC protocol: JSON messages between the browser UI and the server

use serde::{Deserialize, Serialize};
use serde_json::Value;
use showcase_core::{ErrorCategory, ShowcaseError};

/// Client → Gateway request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    pub method: String,
    #[serde(default)]
    pub params: Value,
    /// Optional request ID for correlating responses
    #[serde(default)]
    pub id: Option<String>,
}

/// Gateway → Client response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// Echoed from the request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<GatewayError>,
}

/// Error in a gateway response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayError {
    pub code: i32,
    pub message: String,
    /// Set for classified inference failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub guidance: Vec<String>,
}

/// Methods the client can call
pub mod methods {
    pub const STATUS_GET: &str = "status.get";
    pub const MODELS_LIST: &str = "models.list";
    pub const SESSION_NEW: &str = "session.new";
    pub const SESSION_LIST: &str = "session.list";
    pub const MODEL_SELECT: &str = "model.select";
    pub const MODEL_STATUS: &str = "model.status";
    pub const QUERY_TEXT: &str = "query.text";
    pub const QUERY_FILE: &str = "query.file";
    pub const IMAGE_GENERATE: &str = "image.generate";
    pub const CHAT_SEND: &str = "chat.send";
    pub const CHAT_HISTORY: &str = "chat.history";
    pub const CHAT_RESET: &str = "chat.reset";
}

// ── Error codes ──

pub const ERR_INVALID_METHOD: i32 = -32601;
pub const ERR_INVALID_PARAMS: i32 = -32602;
pub const ERR_INTERNAL: i32 = -32603;
pub const ERR_UNAUTHORIZED: i32 = -32000;
/// Upstream inference failed; `category` says why
pub const ERR_INFERENCE: i32 = -32001;
/// The session already has a request in flight
pub const ERR_BUSY: i32 = -32002;

impl GatewayResponse {
    pub fn ok(id: Option<String>, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Option<String>, code: i32, message: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(GatewayError {
                code,
                message: message.into(),
                category: None,
                guidance: Vec::new(),
            }),
        }
    }

    /// Classified failure with its category and guidance lines attached
    pub fn inference_err(id: Option<String>, err: &ShowcaseError) -> Self {
        let code = match err.category() {
            ErrorCategory::UnsupportedInput => ERR_INVALID_PARAMS,
            _ => ERR_INFERENCE,
        };
        Self {
            id,
            result: None,
            error: Some(GatewayError {
                code,
                message: err.to_string(),
                category: Some(err.category()),
                guidance: err
                    .guidance()
                    .unwrap_or_default()
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

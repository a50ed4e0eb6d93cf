//! Uniform response envelope
//!
//! Every dispatched call answers with the same shape:
//!
//! ```text
//! success: { "status": true,  "data": <serialized result> }
//! failure: { "status": false, "error": { "type": "<kind>", "message": "<text>" } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response metadata header carrying the context id of a successful call
pub const REQUEST_ID_HEADER: &str = "Request-Id";

/// Error part of a failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
}

/// The envelope written for every dispatched call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            status: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: false,
            data: None,
            error: Some(ErrorBody {
                kind: kind.into(),
                message: message.into(),
            }),
        }
    }
}

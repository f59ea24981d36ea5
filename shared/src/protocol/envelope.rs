//! Uniform success/error envelope returned by the Auditor service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error code the service uses when a `set` targets a multi-valued attribute.
pub const DETAIL_CONFLICT_CODE: &str = "detail_conflict";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeType {
    Success,
    Error,
}

/// Response envelope: `{"type": "success"|"error", "data": ...}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EnvelopeType,

    #[serde(default)]
    pub data: Value,
}

/// Error reported by the service inside an envelope
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{msg}")]
pub struct EnvelopeError {
    pub msg: String,
    pub code: Option<String>,
}

impl EnvelopeError {
    pub fn is_detail_conflict(&self) -> bool {
        self.code.as_deref() == Some(DETAIL_CONFLICT_CODE)
    }
}

impl Envelope {
    pub fn success(data: Value) -> Self {
        Self {
            kind: EnvelopeType::Success,
            data,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            kind: EnvelopeType::Error,
            data: serde_json::json!({ "msg": msg.into() }),
        }
    }

    /// Unwrap the payload, turning an error envelope into an [`EnvelopeError`].
    ///
    /// When the service omits `data.msg` the raw `data` is used as the message.
    pub fn into_result(self) -> Result<Value, EnvelopeError> {
        match self.kind {
            EnvelopeType::Success => Ok(self.data),
            EnvelopeType::Error => {
                let msg = match self.data.get("msg").and_then(Value::as_str) {
                    Some(msg) => msg.to_string(),
                    None => self.data.to_string(),
                };
                let code = self
                    .data
                    .get("code")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                Err(EnvelopeError { msg, code })
            }
        }
    }
}

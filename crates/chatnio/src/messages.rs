//! Wire types: WebSocket frames (client ↔ server) and the REST envelope.

use serde::{Deserialize, Serialize};

use crate::error::{decode_error, Error, Result};

/// Client → server: first frame after connecting, binds the socket to a
/// conversation and identity.
#[derive(Debug, Clone, Serialize)]
pub struct Handshake<'a> {
    pub id: i64,
    pub token: &'a str,
}

/// Client → server: chat request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    #[serde(rename = "type")]
    pub typ: &'static str,
    pub message: &'a str,
    pub model: &'a str,
    pub web: bool,
}

impl<'a> ChatRequest<'a> {
    pub fn new(message: &'a str, model: &'a str, web: bool) -> Self {
        Self {
            typ: "chat",
            message,
            model,
            web,
        }
    }
}

/// Server → client: one incremental chunk of a streamed answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMessage {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub quota: f64,
    #[serde(default)]
    pub end: bool,
}

impl PartialMessage {
    /// Terminal frame with no content.
    pub fn terminal() -> Self {
        Self {
            end: true,
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| decode_error("chat frame", e))
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| decode_error("chat frame", e))
    }

    pub fn is_blank(&self) -> bool {
        self.message.trim().is_empty()
    }

    pub fn len(&self) -> usize {
        self.message.len()
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

impl std::fmt::Display for PartialMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "PartialMessage(message={:?}, keyword={:?}, quota={}, end={})",
            self.message, self.keyword, self.quota, self.end
        )
    }
}

/// Uniform REST response: `{status, message, data}`.
///
/// Fields outside the three are kept in `extra`; some endpoints report their
/// payload at the top level rather than under `data`.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    pub status: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Envelope {
    /// Fail with the server message when `status` is false.
    pub fn into_checked(self) -> Result<Self> {
        if self.status {
            Ok(self)
        } else if self.message.is_empty() {
            Err(Error::unauthenticated())
        } else {
            Err(Error::Authentication(self.message))
        }
    }

    /// Decode `data` as `T`.
    pub fn data<T: serde::de::DeserializeOwned>(&self, context: &'static str) -> Result<T> {
        T::deserialize(&self.data).map_err(|e| decode_error(context, e))
    }

    /// Look up `key` at the top level, then inside `data`.
    pub fn field(&self, key: &str) -> Option<&serde_json::Value> {
        self.extra.get(key).or_else(|| self.data.get(key))
    }

    /// Object carrying `key`: `data` when it holds the key, otherwise the
    /// top-level fields.
    pub fn payload_with(&self, key: &str) -> serde_json::Value {
        if self.data.get(key).is_some() {
            self.data.clone()
        } else {
            serde_json::Value::Object(self.extra.clone())
        }
    }
}

//! Error types shared by the REST client and the chat channel.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level client error.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable token, or the server envelope reported `status: false`.
    #[error("{0}")]
    Authentication(String),

    /// A locally checked precondition failed; nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The chat channel was never connected or has been closed.
    #[error("not connected to chat server ({0})")]
    NotConnected(String),
}

impl Error {
    pub(crate) fn unauthenticated() -> Self {
        Error::Authentication("Authentication Error".to_string())
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Network and decoding failures below the domain layer.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("failed to decode {context}: {source}")]
    Decode {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("connection closed by server")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(TransportError::Http(e))
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Error::Transport(TransportError::WebSocket(e))
    }
}

pub(crate) fn decode_error(context: &'static str, source: serde_json::Error) -> Error {
    Error::Transport(TransportError::Decode { context, source })
}

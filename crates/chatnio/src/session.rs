//! Session state: API token and endpoint base, shared by the REST client and
//! every chat channel built from the same handle.
//!
//! Clones share one underlying state. Writes are last-writer-wins; a reader
//! racing a concurrent `set_token`/`set_endpoint` may observe either value.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{Error, Result};

/// Default REST endpoint.
pub const API_BASE: &str = "https://api.chatnio.net";

/// Environment variable read by [`Session::set_token_from_default_env`].
pub const TOKEN_ENV: &str = "CHATNIO_TOKEN";

/// Token sent in the chat handshake when no token is set.
pub const ANONYMOUS_TOKEN: &str = "anonymous";

#[derive(Debug)]
struct State {
    token: String,
    endpoint: String,
}

/// Injectable session handle.
#[derive(Debug, Clone)]
pub struct Session {
    state: Arc<RwLock<State>>,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                token: String::new(),
                endpoint: API_BASE.to_string(),
            })),
        }
    }
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Session pointing at `endpoint` instead of [`API_BASE`].
    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let session = Self::default();
        session.set_endpoint(endpoint)?;
        Ok(session)
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn token(&self) -> String {
        self.read().token.clone()
    }

    /// Store `token`; subsequent requests are sent with `Authorization: Bearer <token>`.
    pub fn set_token(&self, token: impl Into<String>) -> String {
        let token = token.into();
        self.write().token = token.clone();
        tracing::debug!(authenticated = !token.trim().is_empty(), "session token updated");
        token
    }

    /// Read the token from environment variable `name`; unset means empty.
    pub fn set_token_from_env(&self, name: &str) -> String {
        self.set_token(std::env::var(name).unwrap_or_default())
    }

    pub fn set_token_from_default_env(&self) -> String {
        self.set_token_from_env(TOKEN_ENV)
    }

    pub fn clear_token(&self) {
        self.set_token("");
    }

    pub fn is_authenticated(&self) -> bool {
        !self.read().token.trim().is_empty()
    }

    pub fn require_authenticated(&self) -> Result<()> {
        if self.is_authenticated() {
            Ok(())
        } else {
            Err(Error::unauthenticated())
        }
    }

    /// Token for the chat handshake.
    pub fn chat_token(&self) -> String {
        let state = self.read();
        if state.token.trim().is_empty() {
            ANONYMOUS_TOKEN.to_string()
        } else {
            state.token.clone()
        }
    }

    pub fn endpoint(&self) -> String {
        self.read().endpoint.clone()
    }

    /// Replace the REST base. Only `http` and `https` URLs are accepted.
    pub fn set_endpoint(&self, endpoint: &str) -> Result<()> {
        let parsed = reqwest::Url::parse(endpoint.trim())
            .map_err(|e| Error::InvalidArgument(format!("endpoint {endpoint:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidArgument(format!(
                "endpoint {endpoint:?} must use http or https"
            )));
        }
        let normalized = parsed.as_str().trim_end_matches('/').to_string();
        tracing::debug!(endpoint = %normalized, "session endpoint updated");
        self.write().endpoint = normalized;
        Ok(())
    }

    /// Absolute URL for a REST `path` such as `/quota`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.read().endpoint, path)
    }

    /// WebSocket URL derived from the current endpoint.
    pub fn chat_url(&self) -> String {
        let endpoint = self.endpoint();
        let ws = if let Some(rest) = endpoint.strip_prefix("https") {
            format!("wss{rest}")
        } else if let Some(rest) = endpoint.strip_prefix("http") {
            format!("ws{rest}")
        } else {
            endpoint
        };
        format!("{ws}/chat")
    }
}

//! Synchronous chat for callers without an async runtime.
//!
//! Each [`Chat`] owns a current-thread tokio runtime; the socket lives on it
//! for the channel's whole life. Do not call these methods from inside
//! another runtime.

use crate::chat;
use crate::error::{Result, TransportError};
use crate::messages::PartialMessage;
use crate::session::Session;

/// Blocking wrapper around [`chat::Chat`].
pub struct Chat {
    // Dropped before the runtime that drives it.
    inner: chat::Chat,
    runtime: tokio::runtime::Runtime,
}

impl Chat {
    /// Create a channel for `conversation_id` and connect it.
    pub fn connect(session: &Session, conversation_id: i64) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(TransportError::Io)?;
        let inner = runtime.block_on(chat::new_chat(session, conversation_id))?;
        Ok(Self { inner, runtime })
    }

    pub fn id(&self) -> i64 {
        self.inner.id()
    }

    pub fn is_connected(&self) -> bool {
        self.runtime.block_on(self.inner.is_connected())
    }

    /// Ask and call `hook` once per frame until the terminal frame.
    pub fn ask<F>(&self, message: &str, model: &str, web: bool, hook: F) -> Result<()>
    where
        F: FnMut(&PartialMessage),
    {
        self.runtime
            .block_on(self.inner.ask_with(message, model, web, hook))
    }

    pub fn close(&self) -> bool {
        self.runtime.block_on(self.inner.close())
    }
}

//! WebSocket chat channel: connect, handshake, then serialized asks that
//! stream partial frames until one arrives with `end: true`.

use futures_util::{SinkExt, Stream, StreamExt};
use tokio::sync::{Mutex, MutexGuard};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, warn};

use crate::error::{Error, Result, TransportError};
use crate::messages::{ChatRequest, Handshake, PartialMessage};
use crate::session::Session;

/// Model used when the caller has no preference.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// Conversation id that asks the server to start a new conversation.
pub const NEW_CONVERSATION: i64 = -1;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

struct Connection {
    uri: String,
    socket: Option<WsStream>,
    closed: bool,
    /// An ask was sent and its terminal frame has not been read yet.
    awaiting: bool,
}

impl Connection {
    fn socket(&mut self) -> Result<&mut WsStream> {
        let uri = &self.uri;
        self.socket
            .as_mut()
            .ok_or_else(|| Error::NotConnected(uri.clone()))
    }

    fn teardown(&mut self) {
        self.socket = None;
        self.awaiting = false;
    }

    async fn send_json<T: serde::Serialize>(&mut self, frame: &T) -> Result<()> {
        let json = serde_json::to_string(frame)
            .map_err(|e| crate::error::decode_error("outbound frame", e))?;
        let sent = self.socket()?.send(WsMessage::Text(json)).await;
        if let Err(e) = sent {
            self.teardown();
            return Err(e.into());
        }
        Ok(())
    }

    async fn receive(&mut self) -> Result<PartialMessage> {
        loop {
            let item = self.socket()?.next().await;
            let message = match item {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    self.teardown();
                    return Err(e.into());
                }
                None => {
                    self.teardown();
                    return Err(TransportError::Closed.into());
                }
            };
            let decoded = match message {
                WsMessage::Text(text) => PartialMessage::from_json(&text),
                WsMessage::Binary(bytes) => PartialMessage::from_slice(&bytes),
                WsMessage::Close(_) => {
                    self.teardown();
                    return Err(TransportError::Closed.into());
                }
                _ => continue,
            };
            // The stream position is unknown after a bad frame.
            if decoded.is_err() {
                warn!(uri = %self.uri, "undecodable chat frame, closing channel");
                self.teardown();
            }
            return decoded;
        }
    }

    /// Discard what is left of an ask whose handle was dropped early.
    async fn drain(&mut self) -> Result<()> {
        if self.awaiting {
            warn!(uri = %self.uri, "previous ask was abandoned, draining its frames");
        }
        while self.awaiting {
            if self.receive().await?.end {
                self.awaiting = false;
            }
        }
        Ok(())
    }
}

/// Chat channel bound to one conversation.
pub struct Chat {
    id: i64,
    session: Session,
    inner: Mutex<Connection>,
}

/// Create a channel for `conversation_id` and connect it.
pub async fn new_chat(session: &Session, conversation_id: i64) -> Result<Chat> {
    let chat = Chat::new(session.clone(), conversation_id);
    chat.connect().await?;
    Ok(chat)
}

impl Chat {
    /// Unconnected channel; the chat URL is taken from `session` now.
    pub fn new(session: Session, conversation_id: i64) -> Self {
        let uri = session.chat_url();
        Self {
            id: conversation_id,
            session,
            inner: Mutex::new(Connection {
                uri,
                socket: None,
                closed: false,
                awaiting: false,
            }),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Token the handshake carries.
    pub fn token(&self) -> String {
        self.session.chat_token()
    }

    pub async fn uri(&self) -> String {
        self.inner.lock().await.uri.clone()
    }

    pub async fn is_connected(&self) -> bool {
        self.inner.lock().await.socket.is_some()
    }

    /// Open the socket and send the handshake. No reply is awaited.
    pub async fn connect(&self) -> Result<()> {
        let mut conn = self.inner.lock().await;
        if conn.closed {
            return Err(Error::NotConnected(conn.uri.clone()));
        }
        if conn.socket.is_some() {
            debug!(uri = %conn.uri, "chat already connected");
            return Ok(());
        }

        let (socket, _) = tokio_tungstenite::connect_async(conn.uri.as_str()).await?;
        conn.socket = Some(socket);
        debug!(uri = %conn.uri, id = self.id, "chat connected");

        let token = self.token();
        conn.send_json(&Handshake {
            id: self.id,
            token: &token,
        })
        .await
    }

    /// Close the socket. Returns `false` if it was not open.
    pub async fn close(&self) -> bool {
        let mut conn = self.inner.lock().await;
        conn.closed = true;
        conn.awaiting = false;
        match conn.socket.take() {
            Some(mut socket) => {
                if let Err(e) = socket.close(None).await {
                    warn!(uri = %conn.uri, error = %e, "error while closing chat socket");
                }
                debug!(uri = %conn.uri, "chat closed");
                true
            }
            None => false,
        }
    }

    /// Send `message` and return a handle yielding the reply frames.
    ///
    /// Waits for any other ask on this channel to release it first. A blank
    /// message yields one empty terminal frame without touching the network.
    pub async fn ask(&self, message: &str, model: &str, web: bool) -> Result<Ask<'_>> {
        if message.trim().is_empty() {
            return Ok(Ask {
                state: AskState::Immediate(Some(PartialMessage::terminal())),
            });
        }

        let mut conn = self.inner.lock().await;
        conn.socket()?;
        conn.drain().await?;

        debug!(id = self.id, %model, web, "sending chat request");
        conn.send_json(&ChatRequest::new(message, model, web)).await?;
        conn.awaiting = true;

        Ok(Ask {
            state: AskState::Streaming { conn, done: false },
        })
    }

    /// Drive an ask to its terminal frame, calling `hook` for each frame.
    pub async fn ask_with<F>(
        &self,
        message: &str,
        model: &str,
        web: bool,
        mut hook: F,
    ) -> Result<()>
    where
        F: FnMut(&PartialMessage),
    {
        if message.trim().is_empty() {
            return Ok(());
        }
        let mut ask = self.ask(message, model, web).await?;
        while let Some(frame) = ask.next().await {
            hook(&frame?);
        }
        Ok(())
    }

    /// Collect every frame of one ask.
    pub async fn ask_all(
        &self,
        message: &str,
        model: &str,
        web: bool,
    ) -> Result<Vec<PartialMessage>> {
        let mut ask = self.ask(message, model, web).await?;
        let mut frames = Vec::new();
        while let Some(frame) = ask.next().await {
            frames.push(frame?);
        }
        Ok(frames)
    }
}

enum AskState<'a> {
    Immediate(Option<PartialMessage>),
    Streaming {
        conn: MutexGuard<'a, Connection>,
        done: bool,
    },
}

/// In-flight ask. Holds the channel until dropped.
pub struct Ask<'a> {
    state: AskState<'a>,
}

impl<'a> Ask<'a> {
    /// Next frame, or `None` once the terminal frame has been yielded.
    pub async fn next(&mut self) -> Option<Result<PartialMessage>> {
        match &mut self.state {
            AskState::Immediate(frame) => frame.take().map(Ok),
            AskState::Streaming { conn, done } => {
                if *done {
                    return None;
                }
                let item = conn.receive().await;
                match &item {
                    Ok(frame) => {
                        debug!(len = frame.len(), end = frame.end, "chat frame");
                        if frame.end {
                            conn.awaiting = false;
                            *done = true;
                        }
                    }
                    Err(_) => *done = true,
                }
                Some(item)
            }
        }
    }

    /// Adapt into a `Stream` of frames.
    pub fn into_stream(self) -> impl Stream<Item = Result<PartialMessage>> + 'a {
        futures_util::stream::unfold(self, |mut ask| async move {
            ask.next().await.map(|item| (item, ask))
        })
    }
}

impl std::fmt::Debug for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chat")
            .field("id", &self.id)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Display for Chat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Chat(id={}, token={})", self.id, self.token())
    }
}

//! In-process servers shared by the integration tests. No mocks: real TCP
//! sockets on 127.0.0.1 with a minimal HTTP/1.1 responder and a
//! tokio-tungstenite WebSocket acceptor.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use chatnio::{Client, Session};

/// One request as seen by the test server.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// Serve `responses` in order, one connection each, then stop accepting.
/// Returns the base URL and a receiver of captured requests.
pub async fn spawn_http(
    responses: Vec<(u16, String)>,
) -> (String, mpsc::UnboundedReceiver<Captured>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            let head_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break None;
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break Some(pos);
                }
            };
            let Some(head_end) = head_end else { continue };

            let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
            let mut lines = head.split("\r\n");
            let request_line = lines.next().unwrap_or_default();
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let target = parts.next().unwrap_or_default().to_string();
            let headers: Vec<(String, String)> = lines
                .filter_map(|line| line.split_once(':'))
                .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                .collect();

            let content_length = headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, v)| v.parse::<usize>().ok())
                .unwrap_or(0);
            let mut body_bytes = buf[head_end + 4..].to_vec();
            while body_bytes.len() < content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                body_bytes.extend_from_slice(&chunk[..n]);
            }

            let _ = tx.send(Captured {
                method,
                target,
                headers,
                body: String::from_utf8_lossy(&body_bytes).to_string(),
            });

            let reason = if status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                reason,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            let _ = stream.shutdown().await;
        }
    });

    (format!("http://127.0.0.1:{}", port), rx)
}

/// Session pointed at `base` with `token` set (empty means unauthenticated).
pub fn session(base: &str, token: &str) -> Session {
    let session = Session::with_endpoint(base).unwrap();
    session.set_token(token);
    session
}

/// REST client that bypasses any proxy configured in the environment.
pub fn client(session: Session) -> Client {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    Client::with_http(session, http)
}

/// Build a frame the chat server sends.
pub fn frame(message: &str, end: bool) -> String {
    serde_json::json!({ "message": message, "keyword": "", "quota": 0.0, "end": end })
        .to_string()
}

/// WebSocket chat server for one connection. Records the handshake, then
/// answers each chat request with `replies(request_message)` frames.
/// Every text frame received is forwarded on the returned channel.
pub async fn spawn_chat_server<F>(replies: F) -> (String, mpsc::UnboundedReceiver<serde_json::Value>)
where
    F: Fn(&str) -> Vec<String> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (tcp_stream, _) = listener.accept().await.unwrap();
        let ws_stream = tokio_tungstenite::accept_async(tcp_stream).await.unwrap();
        let (mut write, mut read) = ws_stream.split();

        while let Some(Ok(message)) = read.next().await {
            let text = match message {
                Message::Text(t) => t,
                Message::Close(_) => break,
                _ => continue,
            };
            let value: serde_json::Value = serde_json::from_str(&text).unwrap();
            let _ = tx.send(value.clone());
            if value["type"] == "chat" {
                let request = value["message"].as_str().unwrap_or_default().to_string();
                for reply in replies(&request) {
                    if write.send(Message::Text(reply)).await.is_err() {
                        return;
                    }
                }
            }
        }
    });

    (format!("http://127.0.0.1:{}", port), rx)
}

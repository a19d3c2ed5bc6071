//! WebSocket push adapter.
//!
//! Connects to the coordinator's per-user socket, feeds every text frame
//! through [`Session::dispatch`], and writes acknowledgments back on the same
//! connection. A dropped connection is retried after a fixed delay.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{Error as WsError, Message},
};
use tracing::{debug, error, info, warn};

use super::{
    TransportError,
    message::MAX_MESSAGE_SIZE,
    session::{Dispatch, Session},
};

/// Push adapter settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// Socket URL, e.g. `wss://host/ws/addin/user/<email>/`.
    pub url: String,
    /// Pause before reconnecting after the socket closes.
    pub reconnect_delay_ms: u64,
    /// Frames larger than this are read, then dropped; the socket stays open.
    pub max_message_size: usize,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            reconnect_delay_ms: 3_000,
            max_message_size: MAX_MESSAGE_SIZE,
        }
    }
}

/// Builds the per-user socket URL the coordinator expects.
pub fn user_socket_url(base: &str, email: &str) -> String {
    let email = email.trim().to_lowercase();
    let mut encoded = String::with_capacity(email.len());
    for b in email.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(b as char)
            }
            _ => encoded.push_str(&format!("%{b:02X}")),
        }
    }
    format!("{}/ws/addin/user/{encoded}/", base.trim_end_matches('/'))
}

/// Owns the session and drives one socket at a time.
pub struct PushAdapter {
    config: PushConfig,
    session: Session,
}

impl PushAdapter {
    /// Creates the adapter; nothing connects until [`run`](Self::run).
    pub fn new(config: PushConfig, session: Session) -> Self {
        Self { config, session }
    }

    /// The session this adapter feeds.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Connects, serves, and reconnects forever.
    pub async fn run(&mut self) {
        let delay = Duration::from_millis(self.config.reconnect_delay_ms);
        loop {
            match self.serve_once().await {
                Ok(()) => info!(url = %self.config.url, "push connection closed"),
                Err(err) => error!(url = %self.config.url, error = %err, "push connection failed"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Serves a single connection until the peer closes it.
    pub async fn serve_once(&mut self) -> Result<(), TransportError> {
        info!(url = %self.config.url, "connecting push socket");
        let (ws, _) = connect_async(self.config.url.as_str()).await?;
        info!(url = %self.config.url, "push socket open");
        let (mut write, mut read) = ws.split();

        while let Some(frame) = read.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => text,
                    Err(_) => {
                        warn!("dropping non-utf8 binary frame");
                        continue;
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("close frame received");
                    break;
                }
                Ok(_) => continue,
                Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
                Err(err) => return Err(err.into()),
            };

            if text.len() > self.config.max_message_size {
                warn!(
                    size = text.len(),
                    max = self.config.max_message_size,
                    "push frame exceeds max size, dropping"
                );
                continue;
            }

            if let Dispatch::Applied { ack, .. } = self.session.dispatch(&text).await {
                let body = serde_json::to_string(&ack)?;
                write.send(Message::Text(body)).await?;
                debug!(job_id = ?ack.job_id, "ack sent");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn socket_url_lowercases_and_encodes_the_email() {
        assert_eq!(
            user_socket_url("wss://localhost:8001/", " Ann.Lee+x@Example.com "),
            "wss://localhost:8001/ws/addin/user/ann.lee%2Bx%40example.com/"
        );
    }
}

//! Transport adapters and the session context they share.

/// Wire shapes.
pub mod message;
/// Poll-claim-complete adapter.
pub mod pull;
/// WebSocket push adapter.
pub mod push;
/// Session context and message dispatch.
pub mod session;

/// Transport-level failures. None of them stop an adapter.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// WebSocket failure.
    #[error("websocket: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// HTTP client failure.
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
    /// Non-success HTTP status.
    #[error("http status {status}: {body}")]
    Status {
        /// Response status code.
        status: u16,
        /// Response body, best effort.
        body: String,
    },
    /// Invalid JSON.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    /// Valid JSON of the wrong shape.
    #[error("malformed message: {0}")]
    Malformed(String),
}

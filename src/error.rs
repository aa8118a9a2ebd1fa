//! Errors raised by the measurement client.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while running a measurement.
#[derive(Debug, Error)]
pub enum SpeedError {
    /// An HTTP request or its body failed.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// A JSON document could not be read or written.
    #[error("serialize/deserialize error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// The subtest ran out of time.
    #[error("deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    /// The echo WebSocket failed.
    #[error("websocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("tls setup failed: {0}")]
    Tls(#[from] rustls::Error),
    #[error("unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    /// The echo channel closed before every probe was answered.
    #[error("echo channel closed after {received} of {expected} replies")]
    EchoClosed { received: u32, expected: u32 },
    /// The body ended before its announced length.
    #[error("expected {expected} bytes, received {received}")]
    ShortTransfer { expected: u64, received: u64 },
    /// A download unit had a size other than one unit.
    #[error("server sent {received} bytes for a unit of {expected}")]
    UnitSize { expected: u64, received: u64 },
    /// The server answered with a non-success status.
    #[error("server answered with status {0}")]
    Status(reqwest::StatusCode),
    /// The server answered with a body the client does not understand.
    #[error("unexpected server reply: {0}")]
    UnexpectedReply(String),
    #[error("no time elapsed during measurement")]
    NoElapsedTime,
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SpeedError {
    /// Whether the error came from the deadline rather than from the work itself.
    pub fn is_deadline(&self) -> bool {
        matches!(self, SpeedError::DeadlineExceeded(_))
    }

    /// Whether the error originates in the network or the TLS layer.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SpeedError::Http(_)
                | SpeedError::WebSocket(_)
                | SpeedError::Tls(_)
                | SpeedError::EchoClosed { .. }
                | SpeedError::IoError(_)
        )
    }
}

// reducing size of SpeedError by putting large element in the Box
impl From<tokio_tungstenite::tungstenite::Error> for SpeedError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SpeedError::WebSocket(Box::new(e))
    }
}

/// Result type of the measurement client.
pub type Result<T> = std::result::Result<T, SpeedError>;

//! Capped consumption of upload bodies.

use axum::body::Body;
use axum::extract::State;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;

use crate::server::AppState;
use crate::server::error::ServerError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reasons an upload is aborted.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The body grew past the upload cap.
    #[error("body exceeds the {limit} byte limit")]
    LimitExceeded { limit: u64 },
    /// The request body could not be read.
    #[error("body read failed: {0}")]
    Body(BoxError),
}

/// Byte accounting for a single upload request.
#[derive(Debug)]
pub struct UploadSession {
    bytes_received: u64,
    limit: u64,
}

impl UploadSession {
    /// Start accounting against `limit` bytes.
    pub fn new(limit: u64) -> Self {
        UploadSession {
            bytes_received: 0,
            limit,
        }
    }

    /// Add `len` received bytes, failing once the total crosses the limit.
    pub fn record(&mut self, len: usize) -> Result<(), UploadError> {
        self.bytes_received += len as u64;
        if self.bytes_received > self.limit {
            return Err(UploadError::LimitExceeded { limit: self.limit });
        }
        Ok(())
    }

    /// Bytes received so far.
    pub fn bytes_received(&self) -> u64 {
        self.bytes_received
    }
}

/// Drain `source`, returning the number of bytes read.
///
/// Reading stops at the first frame that pushes the total past `limit`; the
/// rest of the input is dropped unread.
pub async fn consume_upload_stream<S, E>(source: S, limit: usize) -> Result<u64, UploadError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<BoxError>,
{
    let mut source = std::pin::pin!(source);
    let mut session = UploadSession::new(limit as u64);

    while let Some(frame) = source.next().await {
        let frame = frame.map_err(|e| UploadError::Body(e.into()))?;
        session.record(frame.len())?;
    }
    Ok(session.bytes_received())
}

/// `POST /upload`: answers with the received size in KiB.
pub async fn upload_handler(
    State(state): State<AppState>,
    body: Body,
) -> Result<String, ServerError> {
    let received =
        consume_upload_stream(body.into_data_stream(), state.config.max_upload_size).await?;
    tracing::debug!(bytes = received, "upload complete");
    Ok((received >> 10).to_string())
}

//! Back-pressured download streams.
//!
//! A producer task feeds chunks into a bounded channel of
//! `high_water_mark` slots; the response body drains the channel as the
//! socket accepts data. The producer therefore never runs more than
//! `high_water_mark` chunks ahead of the client.

use std::convert::Infallible;
use std::num::NonZeroU64;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures_util::{Stream, stream};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chunk::ChunkSource;
use crate::server::AppState;
use crate::server::error::ServerError;

/// Remaining work of one download response.
#[derive(Debug)]
pub struct DownloadSession {
    remaining_chunks: u64,
    chunk: Bytes,
}

impl DownloadSession {
    /// A session that will hand out `chunks` copies of the source chunk.
    pub fn new(chunks: u64, source: &ChunkSource) -> Self {
        DownloadSession {
            remaining_chunks: chunks,
            chunk: source.chunk(),
        }
    }

    /// Chunks still to be produced.
    pub fn remaining_chunks(&self) -> u64 {
        self.remaining_chunks
    }

    /// The next chunk, or `None` once the session is exhausted.
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        if self.remaining_chunks == 0 {
            return None;
        }
        self.remaining_chunks -= 1;
        Some(self.chunk.clone())
    }
}

/// Open a stream of `chunks` chunks.
///
/// Returns the total content length together with the stream. The length is
/// rejected if it does not fit in a `u64`.
pub fn open_download_stream(
    chunks: NonZeroU64,
    source: &ChunkSource,
    high_water_mark: usize,
) -> Result<(u64, impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static), ServerError> {
    let content_length = chunks
        .get()
        .checked_mul(source.size() as u64)
        .ok_or_else(|| ServerError::InvalidSize(chunks.to_string()))?;

    let (tx, rx) = mpsc::channel::<Bytes>(high_water_mark);
    spawn_producer(DownloadSession::new(chunks.get(), source), tx);

    let body = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (Ok(chunk), rx))
    });
    Ok((content_length, body))
}

fn spawn_producer(mut session: DownloadSession, tx: mpsc::Sender<Bytes>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(chunk) = session.next_chunk() {
            if tx.send(chunk).await.is_err() {
                tracing::debug!(
                    remaining = session.remaining_chunks(),
                    "download consumer went away"
                );
                return;
            }
        }
    })
}

/// Parse a `size` parameter into a positive chunk count.
pub fn parse_size(raw: Option<&str>) -> Result<NonZeroU64, ServerError> {
    let raw = raw.ok_or_else(|| ServerError::InvalidSize("missing".into()))?;
    raw.parse::<NonZeroU64>()
        .map_err(|_| ServerError::InvalidSize(raw.to_string()))
}

/// Query string of `GET /download`.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    size: Option<String>,
}

/// `GET /download?size=<chunks>`
pub async fn download_query_handler(
    State(state): State<AppState>,
    query: Result<Query<DownloadQuery>, QueryRejection>,
) -> Result<Response, ServerError> {
    let Query(query) = query.map_err(|e| ServerError::InvalidSize(e.body_text()))?;
    stream_download(&state, query.size.as_deref())
}

/// `GET /download/{size}`
pub async fn download_path_handler(
    State(state): State<AppState>,
    Path(size): Path<String>,
) -> Result<Response, ServerError> {
    stream_download(&state, Some(&size))
}

fn stream_download(state: &AppState, size: Option<&str>) -> Result<Response, ServerError> {
    let chunks = parse_size(size)?;
    let (content_length, body) =
        open_download_stream(chunks, &state.source, state.config.high_water_mark)?;
    tracing::debug!(chunks = chunks.get(), content_length, "download started");

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, content_length.to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        Body::from_stream(body),
    )
        .into_response())
}

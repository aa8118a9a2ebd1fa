//! Measurement server.
//!
//! Serves the echo channel, download streams, capped uploads and a status
//! report. Requests share only the immutable [`ChunkSource`]; every transfer
//! keeps its counters to itself.

pub mod download;
pub mod echo;
pub mod error;
pub mod status;
pub mod upload;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::chunk::ChunkSource;
use crate::config::ServerConfig;
use crate::params;

pub use error::ServerError;

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    source: ChunkSource,
    config: Arc<ServerConfig>,
}

impl AppState {
    /// State with a freshly allocated chunk of `config.chunk_size` bytes.
    pub fn new(config: ServerConfig) -> Self {
        let source = ChunkSource::new(config.chunk_size);
        AppState::with_source(config, source)
    }

    /// State around an existing chunk source.
    pub fn with_source(config: ServerConfig, source: ChunkSource) -> Self {
        AppState {
            source,
            config: Arc::new(config),
        }
    }
}

/// Build the router with all measurement endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(params::ECHO_URL_PATH, get(echo::echo_handler))
        .route(
            params::DOWNLOAD_URL_PATH,
            get(download::download_query_handler),
        )
        .route(
            &format!("{}/{{size}}", params::DOWNLOAD_URL_PATH),
            get(download::download_path_handler),
        )
        .route(params::UPLOAD_URL_PATH, post(upload::upload_handler))
        .route(params::STATUS_URL_PATH, get(status::status_handler))
        .fallback(|| async { ServerError::NotFound })
        .method_not_allowed_fallback(|| async { ServerError::MethodNotAllowed })
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on an already bound listener until Ctrl-C.
pub async fn serve_on(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Bind `config.bind` and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    serve_on(listener, AppState::new(config)).await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::protocol::StatusReport;

    fn test_router() -> Router {
        let config = ServerConfig {
            chunk_size: 1024,
            high_water_mark: 2,
            max_upload_size: 4096,
            ..Default::default()
        };
        router(AppState::new(config))
    }

    async fn fetch(uri: &str) -> axum::response::Response {
        test_router()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(body.to_vec()).unwrap()
    }

    async fn post_upload(len: usize) -> axum::response::Response {
        test_router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/upload")
                    .body(Body::from(vec![7u8; len]))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn download_streams_requested_size() {
        for uri in ["/download?size=5", "/download/5"] {
            let response = fetch(uri).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(response.headers()[header::CONTENT_LENGTH], "5120");

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(body.len(), 5 * 1024);
        }
    }

    #[tokio::test]
    async fn download_rejects_bad_sizes() {
        for uri in [
            "/download",
            "/download?size=0",
            "/download?size=abc",
            "/download?size=-1",
            "/download/0",
            "/download/xyz",
        ] {
            let response = fetch(uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body_text(response).await, "400 Bad Request");
        }
    }

    #[tokio::test]
    async fn upload_reports_kilobytes() {
        for (len, kib) in [(0, "0"), (1023, "0"), (1024, "1"), (3000, "2"), (4096, "4")] {
            let response = post_upload(len).await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_text(response).await, kib);
        }
    }

    #[tokio::test]
    async fn upload_over_cap_is_rejected() {
        let response = post_upload(4097).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "400 Bad Request");
    }

    #[tokio::test]
    async fn echo_requires_upgrade() {
        let response = fetch("/ws").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_text(response).await, "400 Bad Request");
    }

    #[tokio::test]
    async fn status_reports_ok() {
        let response = fetch("/status").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let report: StatusReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.status, "OK");
        assert_eq!(report.version.version, env!("CARGO_PKG_VERSION"));
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let response = fetch("/nope").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_text(response).await, "404 Not Found");
    }

    #[tokio::test]
    async fn wrong_method_is_rejected() {
        let response = fetch("/upload").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(body_text(response).await, "405 Method Not Allowed");
    }
}

//! Error responses of the measurement server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::server::upload::UploadError;

/// Errors a server endpoint can answer with.
///
/// Every variant renders as a plain-text `"<code> <reason>"` body; the
/// detailed message only goes to the log.
#[derive(Debug, Error)]
pub enum ServerError {
    /// `size` is missing, not a positive integer, or too large.
    #[error("invalid download size: {0}")]
    InvalidSize(String),
    /// The upload body was too large or unreadable.
    #[error("upload rejected: {0}")]
    Upload(#[from] UploadError),
    /// `/ws` was requested without a valid upgrade.
    #[error("websocket upgrade required: {0}")]
    UpgradeRequired(String),
    #[error("no such endpoint")]
    NotFound,
    #[error("method not allowed")]
    MethodNotAllowed,
    /// Anything the server itself got wrong.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidSize(_)
            | ServerError::Upload(_)
            | ServerError::UpgradeRequired(_) => StatusCode::BAD_REQUEST,
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("{self}");
        } else {
            tracing::debug!("{self}");
        }
        (status, status_line(status)).into_response()
    }
}

fn status_line(status: StatusCode) -> String {
    format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn renders_status_line() {
        let response = ServerError::InvalidSize("abc".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; charset=utf-8"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"400 Bad Request");
    }

    #[test]
    fn status_mapping() {
        assert_eq!(ServerError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ServerError::Upload(UploadError::LimitExceeded { limit: 1 }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ServerError::Internal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

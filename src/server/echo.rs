//! Echo channel used by the latency test.

use axum::extract::WebSocketUpgrade;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{Message, WebSocket};
use axum::response::Response;

use crate::params;
use crate::server::error::ServerError;

/// `GET /ws`: upgrade to a WebSocket answering every probe with a reply.
pub async fn echo_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Result<Response, ServerError> {
    let ws = ws.map_err(|e| ServerError::UpgradeRequired(e.body_text()))?;
    Ok(ws.on_upgrade(echo))
}

async fn echo(mut socket: WebSocket) {
    while let Some(msg) = socket.recv().await {
        match msg {
            Ok(Message::Text(text)) if text.as_str() == params::PROBE_MESSAGE => {
                if socket
                    .send(Message::Text(params::REPLY_MESSAGE.into()))
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // anything else is ignored
            Err(e) => {
                tracing::debug!("echo channel failed: {e}");
                return;
            }
        }
    }
}

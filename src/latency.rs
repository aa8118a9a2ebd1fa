//! Latency subtest.
//!
//! Sends one probe at a time over the echo channel and waits for its reply
//! before sending the next, so the total time is the sum of round trips.

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::error::{Result, SpeedError};
use crate::params;
use crate::summary::LatencyResult;

/// Perform `ping_count` sequential round trips on `ws`, then close it.
pub async fn run<S>(mut ws: WebSocketStream<S>, ping_count: u32) -> Result<LatencyResult>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    if ping_count == 0 {
        return Ok(LatencyResult {
            duration_ms: 0.0,
            latency_ms: 0.0,
            ping_count,
        });
    }

    let start = Instant::now();
    ws.send(Message::text(params::PROBE_MESSAGE)).await?;

    let mut replies = 0;
    while let Some(msg) = ws.next().await {
        match msg? {
            Message::Text(text) if text.as_str() == params::REPLY_MESSAGE => {
                replies += 1;
                if replies == ping_count {
                    break;
                }
                ws.send(Message::text(params::PROBE_MESSAGE)).await?;
            }
            Message::Close(_) => break,
            _ => {} // other messages are ignored
        }
    }
    let elapsed = start.elapsed();

    if replies < ping_count {
        return Err(SpeedError::EchoClosed {
            received: replies,
            expected: ping_count,
        });
    }

    if let Err(e) = ws.close(None).await {
        tracing::debug!("closing echo channel failed: {e}");
    }

    let duration_ms = elapsed.as_secs_f64() * 1000.0;
    Ok(LatencyResult {
        duration_ms,
        latency_ms: duration_ms / f64::from(ping_count),
        ping_count,
    })
}

//! Download and upload subtests.
//!
//! Both directions move `units` fixed-size units, one HTTP request per unit,
//! and sum the per-request durations. Time spent between requests is not
//! counted.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::time::Instant;

use crate::client::Client;
use crate::error::{Result, SpeedError};
use crate::params;
use crate::summary::ThroughputResult;

/// Direction of a transfer subtest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Server to client.
    Download,
    /// Client to server.
    Upload,
}

/// Transfer `units` units in `direction`, strictly one after another.
///
/// Any failed request fails the whole subtest.
pub async fn run(client: &Client, direction: Direction, units: u32) -> Result<ThroughputResult> {
    let mut elapsed = Duration::ZERO;
    let mut bytes = 0u64;

    for unit in 0..units {
        let start = Instant::now();
        bytes += match direction {
            Direction::Download => download_unit(client).await?,
            Direction::Upload => upload_unit(client).await?,
        };
        elapsed += start.elapsed();
        tracing::trace!(?direction, unit, "unit transferred");
    }

    throughput(elapsed, units, bytes)
}

/// Fold summed request time into a result.
///
/// Speed is `units * 8 / seconds`, i.e. megabits per second with one unit
/// counted as one megabyte.
pub fn throughput(elapsed: Duration, units: u32, bytes: u64) -> Result<ThroughputResult> {
    if elapsed.is_zero() {
        return Err(SpeedError::NoElapsedTime);
    }
    let duration_ms = elapsed.as_secs_f64() * 1000.0;
    Ok(ThroughputResult {
        duration_ms,
        units,
        bytes,
        speed_mbps: f64::from(units) * 8.0 / (duration_ms / 1000.0),
    })
}

async fn download_unit(client: &Client) -> Result<u64> {
    let response = client
        .http()
        .get(client.download_url(params::CHUNKS_PER_UNIT))
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(SpeedError::Status(response.status()));
    }

    let expected = response.content_length();
    let mut received = 0u64;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        received += chunk?.len() as u64;
    }

    if let Some(expected) = expected
        && expected != received
    {
        return Err(SpeedError::ShortTransfer { expected, received });
    }
    check_unit(received)
}

// A unit is only scored as a megabyte if it carried one.
fn check_unit(received: u64) -> Result<u64> {
    let expected = params::UNIT_SIZE as u64;
    if received != expected {
        return Err(SpeedError::UnitSize { expected, received });
    }
    Ok(received)
}

async fn upload_unit(client: &Client) -> Result<u64> {
    let payload = client.upload_body();
    let sent = payload.len() as u64;

    let response = client
        .http()
        .post(client.upload_url())
        .body(payload)
        .send()
        .await?;
    if !response.status().is_success() {
        return Err(SpeedError::Status(response.status()));
    }

    // The server echoes the received size in KiB.
    let text = response.text().await?;
    match text.trim().parse::<u64>() {
        Ok(kib) if kib == sent >> 10 => Ok(sent),
        _ => Err(SpeedError::UnexpectedReply(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throughput_formula() {
        let result = throughput(Duration::from_secs(2), 10, 10 << 20).unwrap();
        assert_eq!(result.duration_ms, 2000.0);
        assert_eq!(result.speed_mbps, 40.0);
        assert_eq!(result.bytes, 10 << 20);
    }

    #[test]
    fn units_must_be_whole() {
        assert_eq!(check_unit(1 << 20).unwrap(), 1 << 20);
        for received in [16 * 1024, (1 << 20) + 1] {
            let err = check_unit(received).unwrap_err();
            assert!(matches!(err, SpeedError::UnitSize { expected, .. } if expected == 1 << 20));
            assert!(!err.is_transport());
        }
    }

    #[test]
    fn zero_time_is_rejected() {
        assert!(matches!(
            throughput(Duration::ZERO, 1, 1),
            Err(SpeedError::NoElapsedTime)
        ));
    }
}

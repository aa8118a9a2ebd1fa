//! Protocol constants and tuning parameters.

use std::time::Duration;

/// Message the client sends on the echo channel.
pub const PROBE_MESSAGE: &str = "ping";

/// Message the server answers every probe with.
pub const REPLY_MESSAGE: &str = "pong";

/// URL path of the echo WebSocket.
pub const ECHO_URL_PATH: &str = "/ws";

/// URL path for the download stream.
pub const DOWNLOAD_URL_PATH: &str = "/download";

/// URL path for uploads.
pub const UPLOAD_URL_PATH: &str = "/upload";

/// URL path of the status report.
pub const STATUS_URL_PATH: &str = "/status";

/// Query parameter carrying the download size in chunks.
pub const SIZE_QUERY_KEY: &str = "size";

/// Query parameter used to defeat caches between transfer requests.
pub const CACHE_BUST_QUERY_KEY: &str = "t";

/// Size of a single streamed chunk (64 KiB).
pub const CHUNK_SIZE: usize = 1 << 16;

/// Size of one measurement unit (1 MiB).
pub const UNIT_SIZE: usize = 1 << 20;

/// Number of chunks that make up one unit.
pub const CHUNKS_PER_UNIT: u64 = (UNIT_SIZE / CHUNK_SIZE) as u64;

/// Largest upload body the server accepts per request (1 MiB).
pub const MAX_UPLOAD_SIZE: usize = 1 << 20;

// A single client upload unit must always fit under the server cap.
const _: () = assert!(MAX_UPLOAD_SIZE >= UNIT_SIZE);
const _: () = assert!(UNIT_SIZE % CHUNK_SIZE == 0);

/// Chunks the download producer may run ahead of the consumer.
pub const HIGH_WATER_MARK: usize = 4;

/// Default server the client measures against.
pub const DEFAULT_SERVER: &str = "https://speedtest.example.net";

/// Default number of sequential echo round trips.
pub const DEFAULT_PING_COUNT: u32 = 100;

/// Default number of download units.
pub const DEFAULT_DOWNLOAD_UNITS: u32 = 100;

/// Default number of upload units.
pub const DEFAULT_UPLOAD_UNITS: u32 = 100;

/// Default time budget of a single subtest.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(30);

/// Default listen address of the server.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

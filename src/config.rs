//! Client and server configuration.
//!
//! [`RawTestConfig`] mirrors user input: every field is optional and `0`
//! counts as "not given". [`TestConfig`] is the validated, immutable form the
//! client runs with.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::params;

/// Configuration errors. These are fatal to a run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The server URL does not parse.
    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The server URL is neither http nor https.
    #[error("server URL must use http or https, got {0}")]
    UnsupportedScheme(String),
    /// Clients request a fixed chunk count per unit, so the chunk size is fixed too.
    #[error("chunk size must be {expected} bytes, got {chunk}")]
    InvalidChunkSize { chunk: usize, expected: usize },
    /// A setting that has to be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    /// The upload cap would reject a single client unit.
    #[error("upload cap of {cap} bytes is smaller than one unit of {unit} bytes")]
    UploadCapTooSmall { cap: usize, unit: usize },
    /// The config file is not valid JSON for [`RawTestConfig`].
    #[error("cannot parse config file: {0}")]
    Json(#[from] serde_json::Error),
    /// The config file cannot be read.
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Unvalidated client settings as read from flags or a JSON file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawTestConfig {
    /// Base URL of the server.
    pub server: Option<String>,
    /// Number of sequential echo round trips.
    pub ping_count: Option<u32>,
    /// Number of 1 MiB download units.
    #[serde(alias = "downloadMegabytes")]
    pub download_units: Option<u32>,
    /// Number of 1 MiB upload units.
    #[serde(alias = "uploadMegabytes")]
    pub upload_units: Option<u32>,
    /// Time budget of each subtest, in seconds.
    pub deadline_seconds: Option<u64>,
}

impl RawTestConfig {
    /// Read a raw configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fields set in `over` replace the ones in `self`.
    pub fn merge(self, over: RawTestConfig) -> Self {
        RawTestConfig {
            server: over.server.or(self.server),
            ping_count: over.ping_count.or(self.ping_count),
            download_units: over.download_units.or(self.download_units),
            upload_units: over.upload_units.or(self.upload_units),
            deadline_seconds: over.deadline_seconds.or(self.deadline_seconds),
        }
    }
}

/// Validated client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestConfig {
    server: Url,
    ping_count: u32,
    download_units: u32,
    upload_units: u32,
    deadline: Duration,
}

impl TestConfig {
    /// Server base URL.
    pub fn server(&self) -> &Url {
        &self.server
    }

    /// Number of echo round trips in the latency test.
    pub fn ping_count(&self) -> u32 {
        self.ping_count
    }

    /// Number of download units.
    pub fn download_units(&self) -> u32 {
        self.download_units
    }

    /// Number of upload units.
    pub fn upload_units(&self) -> u32 {
        self.upload_units
    }

    /// Time budget of a single subtest.
    pub fn deadline(&self) -> Duration {
        self.deadline
    }
}

impl TryFrom<RawTestConfig> for TestConfig {
    type Error = ConfigError;

    fn try_from(raw: RawTestConfig) -> Result<Self, Self::Error> {
        let server = Url::parse(raw.server.as_deref().unwrap_or(params::DEFAULT_SERVER))?;
        match server.scheme() {
            "http" | "https" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        Ok(TestConfig {
            server,
            ping_count: or_default(raw.ping_count, params::DEFAULT_PING_COUNT),
            download_units: or_default(raw.download_units, params::DEFAULT_DOWNLOAD_UNITS),
            upload_units: or_default(raw.upload_units, params::DEFAULT_UPLOAD_UNITS),
            deadline: Duration::from_secs(or_default(
                raw.deadline_seconds,
                params::DEFAULT_DEADLINE.as_secs(),
            )),
        })
    }
}

// zero is treated like an absent value
fn or_default<T: Default + PartialEq>(value: Option<T>, default: T) -> T {
    match value {
        Some(v) if v != T::default() => v,
        _ => default,
    }
}

/// Server tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind: SocketAddr,
    /// Size of one streamed download chunk.
    pub chunk_size: usize,
    /// Chunks a download producer may queue ahead of the socket.
    pub high_water_mark: usize,
    /// Largest accepted upload body.
    pub max_upload_size: usize,
}

impl ServerConfig {
    /// Defaults listening on `bind`.
    pub fn new(bind: SocketAddr) -> Self {
        ServerConfig {
            bind,
            chunk_size: params::CHUNK_SIZE,
            high_water_mark: params::HIGH_WATER_MARK,
            max_upload_size: params::MAX_UPLOAD_SIZE,
        }
    }

    /// Check the invariants the transfer engine relies on.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.chunk_size != params::CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                chunk: self.chunk_size,
                expected: params::CHUNK_SIZE,
            });
        }
        if self.high_water_mark == 0 {
            return Err(ConfigError::Zero("high water mark"));
        }
        if self.max_upload_size == 0 {
            return Err(ConfigError::Zero("upload cap"));
        }
        if self.max_upload_size < params::UNIT_SIZE {
            return Err(ConfigError::UploadCapTooSmall {
                cap: self.max_upload_size,
                unit: params::UNIT_SIZE,
            });
        }
        Ok(self)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig::new(SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}

//! Network path measurement: latency, download and upload throughput.
//!
//! The crate contains both halves of the measurement:
//!
//! - [`server`] exposes an echo WebSocket, back-pressured download streams,
//!   capped uploads and a status report over HTTP.
//! - [`client::Client`] drives the three subtests against such a server, one
//!   after another, each under its own deadline, and collects a
//!   [`summary::SpeedTestResult`] in which every subtest either succeeded or
//!   carries its own failure.
//!
//! # Quick start
//!
//! ```no_run
//! use speedprobe::client::Client;
//! use speedprobe::config::{RawTestConfig, TestConfig};
//! use speedprobe::emitter::NullEmitter;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TestConfig::try_from(RawTestConfig {
//!     server: Some("http://127.0.0.1:8080".into()),
//!     ping_count: Some(10),
//!     ..Default::default()
//! })?;
//! let client = Client::new(config)?;
//! let result = client.run(&mut NullEmitter).await;
//! println!("{:?}", result.latency);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod chunk;
pub mod client;
pub mod config;
pub mod deadline;
pub mod emitter;
pub mod error;
pub mod latency;
pub mod params;
pub mod protocol;
pub mod server;
pub mod summary;
pub mod transfer;

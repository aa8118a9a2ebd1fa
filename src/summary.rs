//! Result records produced by a test run.

use serde::Serialize;

use crate::error::SpeedError;

/// Why a subtest failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// The subtest ran out of time.
    Deadline,
    /// The connection or the TLS layer failed.
    Transport,
    /// The server answered with something unexpected.
    Protocol,
}

impl From<&SpeedError> for FailureKind {
    fn from(e: &SpeedError) -> Self {
        if e.is_deadline() {
            FailureKind::Deadline
        } else if e.is_transport() {
            FailureKind::Transport
        } else {
            FailureKind::Protocol
        }
    }
}

/// Outcome of one subtest: either its metrics or a failure descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SubTestResult<T> {
    /// The subtest completed.
    Success(T),
    /// The subtest failed; the other subtests are unaffected.
    Failure {
        /// Failure category.
        kind: FailureKind,
        /// Human-readable cause.
        reason: String,
    },
}

impl<T> SubTestResult<T> {
    /// The metrics, if the subtest succeeded.
    pub fn success(&self) -> Option<&T> {
        match self {
            SubTestResult::Success(v) => Some(v),
            SubTestResult::Failure { .. } => None,
        }
    }

    /// Whether the subtest failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, SubTestResult::Failure { .. })
    }
}

impl<T> From<Result<T, SpeedError>> for SubTestResult<T> {
    fn from(res: Result<T, SpeedError>) -> Self {
        match res {
            Ok(v) => SubTestResult::Success(v),
            Err(e) => SubTestResult::Failure {
                kind: FailureKind::from(&e),
                reason: e.to_string(),
            },
        }
    }
}

/// Metrics of the latency subtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyResult {
    /// Wall-clock time of all round trips, in milliseconds.
    pub duration_ms: f64,
    /// Mean round-trip time, in milliseconds.
    pub latency_ms: f64,
    /// Number of round trips.
    pub ping_count: u32,
}

/// Metrics of a download or upload subtest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputResult {
    /// Sum of the per-request durations, in milliseconds.
    pub duration_ms: f64,
    /// Number of units transferred.
    pub units: u32,
    /// Total bytes transferred.
    pub bytes: u64,
    /// Throughput in megabits per second.
    pub speed_mbps: f64,
}

/// Combined outcome of the three subtests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpeedTestResult {
    /// Latency subtest outcome.
    pub latency: SubTestResult<LatencyResult>,
    /// Download subtest outcome.
    pub download: SubTestResult<ThroughputResult>,
    /// Upload subtest outcome.
    pub upload: SubTestResult<ThroughputResult>,
}

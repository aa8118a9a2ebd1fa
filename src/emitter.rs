//! Output formatting for test events.
//!
//! The [`Emitter`] trait defines callbacks for each stage of a test run.
//! Two implementations are provided:
//! - [`HumanReadableEmitter`] — progress lines and a formatted summary on a terminal.
//! - [`JsonEmitter`] — one JSON object per line, suitable for machine consumption.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::protocol::{StatusReport, TestKind};
use crate::summary::{SpeedTestResult, SubTestResult, ThroughputResult};

#[derive(Serialize)]
#[serde(tag = "type")]
enum Event<'a> {
    Server { status: &'a StatusReport },
    Starting { test: TestKind },
    Error { test: TestKind, error: &'a str },
    Complete { test: TestKind },
    Summary { summary: &'a SpeedTestResult },
}

/// Callbacks for test lifecycle events.
pub trait Emitter {
    /// Called with the server's status report, when one was fetched.
    fn on_server(&mut self, status: &StatusReport) -> Result<()>;
    /// Called when a subtest is about to begin.
    fn on_starting(&mut self, test: TestKind) -> Result<()>;
    /// Called when a subtest fails.
    fn on_error(&mut self, test: TestKind, err: &str) -> Result<()>;
    /// Called when a subtest succeeds.
    fn on_complete(&mut self, test: TestKind) -> Result<()>;
    /// Called after all subtests, with the combined result.
    fn on_summary(&mut self, s: &SpeedTestResult) -> Result<()>;
}

/// Emits human-readable progress and results to a writer.
pub struct HumanReadableEmitter<W: Write> {
    out: W,
}

impl<W: Write> HumanReadableEmitter<W> {
    /// Create a new emitter writing to `out`.
    pub fn new(out: W) -> Self {
        HumanReadableEmitter { out }
    }

    fn throughput(&mut self, title: &str, r: &SubTestResult<ThroughputResult>) -> Result<()> {
        writeln!(self.out, "\n{:>20}", title)?;
        match r {
            SubTestResult::Success(t) => {
                writeln!(self.out, "{:>15}: {:>7.1} Mbit/s", "Throughput", t.speed_mbps)?;
                writeln!(self.out, "{:>15}: {:>7.1} ms", "Duration", t.duration_ms)?;
                writeln!(self.out, "{:>15}: {:>7} MiB", "Volume", t.units)?;
            }
            SubTestResult::Failure { reason, .. } => {
                writeln!(self.out, "{:>15}: {reason}", "Failed")?;
            }
        }
        Ok(())
    }
}

impl<W: Write> Emitter for HumanReadableEmitter<W> {
    fn on_server(&mut self, status: &StatusReport) -> Result<()> {
        writeln!(
            self.out,
            "server: {} {} ({}/{})",
            status.version.name, status.version.version, status.version.os, status.version.arch
        )?;
        Ok(())
    }

    fn on_starting(&mut self, test: TestKind) -> Result<()> {
        write!(self.out, "\rstarting {:?}", test)?;
        self.out.flush()?;
        Ok(())
    }

    fn on_error(&mut self, test: TestKind, err: &str) -> Result<()> {
        write!(self.out, "\n{:?} test failed: {err}\n", test)?;
        Ok(())
    }

    fn on_complete(&mut self, test: TestKind) -> Result<()> {
        write!(self.out, "\n{:?}: complete\n", test)?;
        Ok(())
    }

    fn on_summary(&mut self, s: &SpeedTestResult) -> Result<()> {
        writeln!(self.out, "\nTest results")?;

        writeln!(self.out, "\n{:>20}", "Latency")?;
        match &s.latency {
            SubTestResult::Success(l) => {
                writeln!(self.out, "{:>15}: {:>7.1} ms", "Latency", l.latency_ms)?;
                writeln!(self.out, "{:>15}: {:>7}", "Round trips", l.ping_count)?;
            }
            SubTestResult::Failure { reason, .. } => {
                writeln!(self.out, "{:>15}: {reason}", "Failed")?;
            }
        }

        self.throughput("Download", &s.download)?;
        self.throughput("Upload", &s.upload)?;
        Ok(())
    }
}

/// Emits one JSON object per line for each event.
pub struct JsonEmitter<W: Write> {
    out: W,
}

impl<W: Write> JsonEmitter<W> {
    /// Create a new JSON emitter writing to `out`.
    pub fn new(out: W) -> Self {
        JsonEmitter { out }
    }

    fn emit(&mut self, event: &Event) -> Result<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.out, "{}", json)?;
        Ok(())
    }
}

impl<W: Write> Emitter for JsonEmitter<W> {
    fn on_server(&mut self, status: &StatusReport) -> Result<()> {
        self.emit(&Event::Server { status })
    }

    fn on_starting(&mut self, test: TestKind) -> Result<()> {
        self.emit(&Event::Starting { test })
    }

    fn on_error(&mut self, test: TestKind, err: &str) -> Result<()> {
        self.emit(&Event::Error { test, error: err })
    }

    fn on_complete(&mut self, test: TestKind) -> Result<()> {
        self.emit(&Event::Complete { test })
    }

    fn on_summary(&mut self, s: &SpeedTestResult) -> Result<()> {
        self.emit(&Event::Summary { summary: s })
    }
}

/// Discards every event.
pub struct NullEmitter;

impl Emitter for NullEmitter {
    fn on_server(&mut self, _: &StatusReport) -> Result<()> {
        Ok(())
    }

    fn on_starting(&mut self, _: TestKind) -> Result<()> {
        Ok(())
    }

    fn on_error(&mut self, _: TestKind, _: &str) -> Result<()> {
        Ok(())
    }

    fn on_complete(&mut self, _: TestKind) -> Result<()> {
        Ok(())
    }

    fn on_summary(&mut self, _: &SpeedTestResult) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::summary::{FailureKind, LatencyResult};

    use super::*;

    fn sample() -> SpeedTestResult {
        SpeedTestResult {
            latency: SubTestResult::Success(LatencyResult {
                duration_ms: 100.0,
                latency_ms: 25.0,
                ping_count: 4,
            }),
            download: SubTestResult::Success(ThroughputResult {
                duration_ms: 1000.0,
                units: 1,
                bytes: 1 << 20,
                speed_mbps: 8.0,
            }),
            upload: SubTestResult::Failure {
                kind: FailureKind::Transport,
                reason: "connection reset".into(),
            },
        }
    }

    #[test]
    fn human_readable_summary() {
        let mut buf = Vec::new();
        let mut emitter = HumanReadableEmitter::new(&mut buf);

        emitter.on_summary(&sample()).unwrap();

        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("25.0 ms"));
        assert!(out.contains("8.0 Mbit/s"));
        assert!(out.contains("connection reset"));
    }

    #[test]
    fn json_emitter_valid() {
        let mut buf = Vec::new();
        let mut emitter = JsonEmitter::new(&mut buf);

        emitter.on_starting(TestKind::Upload).unwrap();

        let out = String::from_utf8(buf).unwrap();

        let res = serde_json::from_str::<serde_json::Value>(&out).unwrap();

        assert_eq!(res["test"], "upload");
        assert_eq!(res["type"], "Starting");
    }

    #[test]
    fn json_summary_carries_failures() {
        let mut buf = Vec::new();
        let mut emitter = JsonEmitter::new(&mut buf);

        emitter.on_summary(&sample()).unwrap();

        let res = serde_json::from_slice::<serde_json::Value>(&buf).unwrap();
        assert_eq!(res["type"], "Summary");
        assert_eq!(res["summary"]["upload"]["status"], "failure");
        assert_eq!(res["summary"]["upload"]["kind"], "transport");
    }
}

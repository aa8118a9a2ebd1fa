//! Types shared by the server and the client.

use serde::{Deserialize, Serialize};

/// Which subtest an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestKind {
    /// Sequential echo round trips.
    Latency,
    /// Server-to-client transfer.
    Download,
    /// Client-to-server transfer.
    Upload,
}

/// Build and platform of the running server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Package name.
    pub name: String,
    /// Package version.
    pub version: String,
    /// Operating system the binary was built for.
    pub os: String,
    /// CPU architecture the binary was built for.
    pub arch: String,
}

impl VersionInfo {
    /// Version information of this build.
    pub fn current() -> Self {
        VersionInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Memory statistics, in bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryStats {
    /// Resident set size of the server process.
    pub rss_bytes: u64,
    /// Virtual memory of the server process.
    pub virtual_bytes: u64,
    /// Total memory of the host.
    pub total_bytes: u64,
    /// Memory available on the host.
    pub available_bytes: u64,
}

/// Body of `GET /status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Always `"OK"`.
    pub status: String,
    /// Build information.
    pub version: VersionInfo,
    /// Current memory usage.
    pub memory: MemoryStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_status_report() {
        let json = r#"{
            "status": "OK",
            "version": {"name": "speedprobe", "version": "0.1.0", "os": "linux", "arch": "x86_64"},
            "memory": {"rss_bytes": 1024, "virtual_bytes": 4096, "total_bytes": 8192, "available_bytes": 2048}
        }"#;
        let report: StatusReport = serde_json::from_str(json).unwrap();

        assert_eq!(report.status, "OK");
        assert_eq!(report.version.name, "speedprobe");
        assert_eq!(report.memory.rss_bytes, 1024);
        assert_eq!(report.memory.available_bytes, 2048);
    }

    #[test]
    fn test_kind_is_lowercase() {
        let json = serde_json::to_string(&TestKind::Latency).unwrap();
        assert_eq!(json, r#""latency""#);
    }
}

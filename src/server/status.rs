//! Server status report.

use axum::Json;
use sysinfo::{ProcessesToUpdate, System};

use crate::protocol::{MemoryStats, StatusReport, VersionInfo};
use crate::server::error::ServerError;

/// Snapshot the memory usage of this process and host.
pub fn collect() -> StatusReport {
    let mut sys = System::new();
    sys.refresh_memory();

    let mut memory = MemoryStats {
        total_bytes: sys.total_memory(),
        available_bytes: sys.available_memory(),
        ..Default::default()
    };

    match sysinfo::get_current_pid() {
        Ok(pid) => {
            sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
            if let Some(process) = sys.process(pid) {
                memory.rss_bytes = process.memory();
                memory.virtual_bytes = process.virtual_memory();
            }
        }
        Err(e) => tracing::warn!("cannot determine own pid: {e}"),
    }

    StatusReport {
        status: "OK".to_string(),
        version: VersionInfo::current(),
        memory,
    }
}

/// `GET /status`
pub async fn status_handler() -> Result<Json<StatusReport>, ServerError> {
    let report = tokio::task::spawn_blocking(collect)
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_ok() {
        let report = collect();
        assert_eq!(report.status, "OK");
        assert_eq!(report.version.name, env!("CARGO_PKG_NAME"));
        assert!(report.memory.total_bytes >= report.memory.available_bytes);
    }
}

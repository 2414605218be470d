//! Prometheus metrics for the node plugin
//!
//! Counts and times every Node RPC and tracks host-side teardown steps
//! that are best-effort and would otherwise only show up in logs.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tonic::Status;
use tracing::info;

/// Metric names
pub mod names {
    /// Counter: Total number of CSI operations by type and status
    pub const CSI_OPERATIONS_TOTAL: &str = "csi_operations_total";
    /// Histogram: Duration of CSI operations in seconds
    pub const CSI_OPERATION_DURATION_SECONDS: &str = "csi_operation_duration_seconds";
    /// Counter: SCSI bus rescans that failed during staging
    pub const CSI_SCSI_RESCAN_FAILURES_TOTAL: &str = "csi_scsi_rescan_failures_total";
    /// Counter: Multipath maps flushed after their paths were detached
    pub const CSI_MULTIPATH_REMOVALS_TOTAL: &str = "csi_multipath_removals_total";
}

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP server on the specified address that serves metrics
/// at the `/metrics` endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on http://{}/metrics", addr);
    Ok(())
}

/// Record a CSI operation with its result
pub fn record_operation(operation: &str, status: &str, duration_secs: f64) {
    counter!(names::CSI_OPERATIONS_TOTAL, "operation" => operation.to_string(), "status" => status.to_string())
        .increment(1);
    histogram!(names::CSI_OPERATION_DURATION_SECONDS, "operation" => operation.to_string())
        .record(duration_secs);
}

pub fn record_rescan_failure() {
    counter!(names::CSI_SCSI_RESCAN_FAILURES_TOTAL).increment(1);
}

pub fn record_multipath_removal(success: bool) {
    counter!(names::CSI_MULTIPATH_REMOVALS_TOTAL, "success" => success.to_string()).increment(1);
}

/// Helper for timing operations
pub struct OperationTimer {
    operation: &'static str,
    start: Instant,
}

impl OperationTimer {
    /// Start timing an operation
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            start: Instant::now(),
        }
    }

    /// Complete the operation with success
    pub fn success(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_operation(self.operation, "success", duration);
    }

    /// Complete the operation with failure
    pub fn failure(self, error_code: &str) {
        let duration = self.start.elapsed().as_secs_f64();
        record_operation(self.operation, error_code, duration);
    }

    /// Complete the operation from an RPC result, labelled by gRPC code on failure
    pub fn observe<T>(self, result: &Result<T, Status>) {
        match result {
            Ok(_) => self.success(),
            Err(status) => self.failure(&format!("{:?}", status.code())),
        }
    }
}

//! Runtime options for the node plugin.
//!
//! Built by `main` from command-line flags and environment; kept free of
//! clap types so tests can construct it directly.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::DriverError;

/// Attach limit reported to the orchestrator when no override is configured.
///
/// An instance supports 127 attached volumes, one of which is the boot volume.
pub const DEFAULT_MAX_VOLUMES_PER_INSTANCE: i64 = 127 - 1;

#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// CSI endpoint, `unix://<path>`
    pub endpoint: String,
    /// Kubernetes node name, used in metadata error messages
    pub node_name: String,
    /// JSON file with the node labels carrying the instance identity
    pub node_labels_path: PathBuf,
    /// JSON catalog of instances and images
    pub cloud_catalog_path: PathBuf,
    /// Operator override of the per-node volume limit (negative means unset)
    pub volume_attach_limit: Option<i64>,
    /// Polls of `/dev/disk/by-id` before a WWN lookup gives up
    pub device_wait_attempts: u32,
    pub device_wait_interval: Duration,
}

impl DriverOptions {
    /// Effective max-volumes-per-node: the override if set, else the default.
    pub fn max_volumes_per_node(&self) -> i64 {
        match self.volume_attach_limit {
            Some(limit) if limit >= 0 => limit,
            _ => DEFAULT_MAX_VOLUMES_PER_INSTANCE,
        }
    }

    /// Socket path of a `unix://` endpoint.
    pub fn socket_path(&self) -> Result<PathBuf, DriverError> {
        let path = self
            .endpoint
            .strip_prefix("unix://")
            .or_else(|| self.endpoint.strip_prefix("unix:"))
            .filter(|p| p.starts_with('/'))
            .ok_or_else(|| DriverError::Endpoint(self.endpoint.clone()))?;
        Ok(PathBuf::from(path))
    }
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            endpoint: "unix:///var/lib/csi/sockets/pluginproxy/csi.sock".to_string(),
            node_name: String::new(),
            node_labels_path: PathBuf::from("/etc/powervs-csi/node-labels.json"),
            cloud_catalog_path: PathBuf::from("/etc/powervs-csi/catalog.json"),
            volume_attach_limit: None,
            device_wait_attempts: 5,
            device_wait_interval: Duration::from_secs(1),
        }
    }
}

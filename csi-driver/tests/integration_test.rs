//! Integration tests for the node plugin library
//!
//! These tests exercise the public surface without touching the host's
//! devices or mounts:
//! - Identity constants and capability enum values
//! - Service construction from node labels and the cloud catalog
//! - Option defaults and endpoint parsing
//! - Concurrent Identity calls

use std::path::Path;
use std::sync::Arc;

use tonic::Request;

use csi_driver::csi;
use csi_driver::csi::identity_server::Identity;
use csi_driver::csi::node_server::Node;
use csi_driver::identity::{DRIVER_NAME, DRIVER_VERSION};
use csi_driver::node::DISK_TYPE_KEY;
use csi_driver::{DriverError, DriverOptions, IdentityService, NodeService};

// ============================================================================
// Identity Service Tests
// ============================================================================

/// Test driver name constant from library
#[test]
fn test_driver_name_constant() {
    assert_eq!(DRIVER_NAME, "powervs.csi.ibm.com");
    // CSI driver names should follow DNS naming conventions
    assert!(
        DRIVER_NAME
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    );
}

/// Test driver version constant from library
#[test]
fn test_driver_version_constant() {
    let parts: Vec<&str> = DRIVER_VERSION.split('.').collect();
    assert_eq!(parts.len(), 3, "Version should have 3 parts (semver)");
    for part in parts {
        assert!(
            part.parse::<u32>().is_ok(),
            "Version part should be a number"
        );
    }
}

/// Test plugin capability type enum values
#[test]
fn test_plugin_capability_service_type() {
    use csi::plugin_capability::service::Type as ServiceType;

    assert_eq!(ServiceType::ControllerService as i32, 1);
    assert_eq!(ServiceType::VolumeAccessibilityConstraints as i32, 2);
}

/// Test node capability RPC types
#[test]
fn test_node_capability_types() {
    use csi::node_service_capability::rpc::Type as RpcType;

    assert_eq!(RpcType::StageUnstageVolume as i32, 1);
    assert_eq!(RpcType::GetVolumeStats as i32, 2);
    assert_eq!(RpcType::ExpandVolume as i32, 3);
    assert_eq!(RpcType::VolumeCondition as i32, 4);
}

/// Test volume access mode wire values
#[test]
fn test_volume_access_modes() {
    use csi::volume_capability::access_mode::Mode;

    assert_eq!(Mode::SingleNodeWriter as i32, 1);
    assert_eq!(Mode::MultiNodeMultiWriter as i32, 5);
    assert_eq!(Mode::SingleNodeSingleWriter as i32, 7);
    assert!(Mode::try_from(6).is_err());
}

/// Test topology key is a valid label key
#[test]
fn test_topology_key_format() {
    let (prefix, name) = DISK_TYPE_KEY.split_once('/').unwrap();
    assert!(prefix.starts_with(DRIVER_NAME));
    assert_eq!(name, "disk-type");
}

#[tokio::test]
async fn test_concurrent_identity_requests() {
    let service = Arc::new(IdentityService::new());
    let mut handles = vec![];

    for _ in 0..15 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .probe(Request::new(csi::ProbeRequest {}))
                .await
                .map(|r| r.into_inner().ready)
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), Some(true));
    }
}

// ============================================================================
// Service Construction Tests
// ============================================================================

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn options_in(dir: &Path, labels: &str, catalog: &str) -> DriverOptions {
    DriverOptions {
        node_name: "worker-0".to_string(),
        node_labels_path: write(dir, "labels.json", labels),
        cloud_catalog_path: write(dir, "catalog.json", catalog),
        ..Default::default()
    }
}

const LABELS: &str = r#"{
    "serviceInstanceId": "c7e6f3a1-workspace",
    "nodeInstanceId": "pvm-0a1b2c",
    "region": "lon",
    "kubernetes.io/hostname": "worker-0"
}"#;

const CATALOG: &str = r#"{
    "instances": [{ "id": "pvm-0a1b2c", "name": "worker-0", "imageId": "img-rhcos" }],
    "images": [{ "id": "img-rhcos", "name": "rhcos-414", "diskType": "tier3" }]
}"#;

#[tokio::test]
async fn test_from_environment_serves_node_info() {
    let dir = tempfile::tempdir().unwrap();
    let service = NodeService::from_environment(options_in(dir.path(), LABELS, CATALOG)).unwrap();

    let info = service
        .node_get_info(Request::new(csi::NodeGetInfoRequest {}))
        .await
        .unwrap()
        .into_inner();

    assert_eq!(info.node_id, "pvm-0a1b2c");
    assert_eq!(info.max_volumes_per_node, 126);
    assert_eq!(
        info.accessible_topology.unwrap().segments.get(DISK_TYPE_KEY),
        Some(&"tier3".to_string())
    );
}

#[test]
fn test_from_environment_missing_label() {
    let dir = tempfile::tempdir().unwrap();
    let labels = r#"{ "serviceInstanceId": "c7e6f3a1-workspace", "region": "lon" }"#;

    let err = NodeService::from_environment(options_in(dir.path(), labels, CATALOG))
        .err()
        .unwrap();
    assert!(matches!(err, DriverError::Metadata(_)));
    assert!(err.to_string().contains("nodeInstanceId"));
    assert!(err.to_string().contains("worker-0"));
}

#[test]
fn test_from_environment_missing_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = options_in(dir.path(), LABELS, CATALOG);
    options.cloud_catalog_path = dir.path().join("absent.json");

    let err = NodeService::from_environment(options).err().unwrap();
    assert!(matches!(err, DriverError::Cloud(_)));
}

#[test]
fn test_from_environment_malformed_labels() {
    let dir = tempfile::tempdir().unwrap();
    let err = NodeService::from_environment(options_in(dir.path(), "not json", CATALOG))
        .err()
        .unwrap();
    assert!(matches!(err, DriverError::Metadata(_)));
}

// ============================================================================
// Option Tests
// ============================================================================

#[test]
fn test_default_endpoint_is_unix_socket() {
    let options = DriverOptions::default();
    let path = options.socket_path().unwrap();
    assert!(path.is_absolute());
    assert_eq!(path.file_name().unwrap(), "csi.sock");
}

#[test]
fn test_negative_attach_limit_means_default() {
    let options = DriverOptions {
        volume_attach_limit: Some(-1),
        ..Default::default()
    };
    assert_eq!(options.max_volumes_per_node(), 126);
}

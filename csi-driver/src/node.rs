//! CSI Node Service Implementation
//!
//! Stages Fibre Channel LUNs onto a node-local staging path and publishes
//! them to workload target paths, either as a bind-mounted filesystem or as
//! a raw block device.
//!
//! No attachment state is kept between calls. Every RPC re-reads the mount
//! table and the device tree through the `platform` collaborators, so a
//! retried call after a crash or timeout converges on the same result.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use tonic::{Request, Response, Status};
use tracing::{debug, error, info, warn};

use crate::cloud::{CatalogCloud, Cloud, Metadata};
use crate::csi;
use crate::csi::volume_capability::AccessType;
use crate::csi::volume_capability::access_mode::Mode;
use crate::error::DriverError;
use crate::metrics::{self, OperationTimer};
use crate::options::DriverOptions;
use crate::platform::{
    DEFAULT_FS_TYPE, DeviceResolver, FibreChannel, Mounter, NodeMounter, PlatformError,
};
use crate::types::{PARTITION_KEY, Partition, WWN_KEY, merge_mount_flags};

/// Topology segment key carrying the disk tier of the node's boot image
pub const DISK_TYPE_KEY: &str = "powervs.csi.ibm.com/disk-type";

/// Access modes this node accepts
const SUPPORTED_ACCESS_MODES: &[Mode] = &[Mode::SingleNodeWriter];

/// RPCs advertised by NodeGetCapabilities
const NODE_CAPABILITIES: &[csi::node_service_capability::rpc::Type] = &[
    csi::node_service_capability::rpc::Type::StageUnstageVolume,
    csi::node_service_capability::rpc::Type::ExpandVolume,
];

/// CSI Node Service
///
/// Implements the CSI Node service which handles:
/// - Volume staging (rescan, resolve WWN, format if needed, mount to staging path)
/// - Volume unstaging (unmount, detach SCSI paths, flush the multipath map)
/// - Volume publishing (bind mount from staging, or raw device, to target path)
/// - Volume unpublishing (unmount from target path)
/// - Online filesystem expansion
/// - Node identity, topology and attach limit reporting
pub struct NodeService {
    mounter: Arc<dyn Mounter>,
    resolver: Arc<dyn DeviceResolver>,
    cloud: Arc<dyn Cloud>,
    metadata: Metadata,
    options: DriverOptions,
    /// Volume IDs with a NodeExpandVolume in flight
    expanding: Mutex<HashSet<String>>,
}

/// Held for the duration of one NodeExpandVolume call.
struct ExpandGuard<'a> {
    expanding: &'a Mutex<HashSet<String>>,
    volume_id: String,
}

impl Drop for ExpandGuard<'_> {
    fn drop(&mut self) {
        self.expanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.volume_id);
    }
}

fn internal(message: String) -> Status {
    error!("{}", message);
    Status::internal(message)
}

impl NodeService {
    /// Create a NodeService over explicit collaborators.
    pub fn new(
        options: DriverOptions,
        mounter: Arc<dyn Mounter>,
        resolver: Arc<dyn DeviceResolver>,
        cloud: Arc<dyn Cloud>,
        metadata: Metadata,
    ) -> Self {
        Self {
            mounter,
            resolver,
            cloud,
            metadata,
            options,
            expanding: Mutex::new(HashSet::new()),
        }
    }

    /// Create a NodeService backed by the host and the configured catalog.
    ///
    /// Fails if the node labels or the cloud catalog cannot be loaded.
    pub fn from_environment(options: DriverOptions) -> Result<Self, DriverError> {
        let metadata = Metadata::load(&options.node_labels_path, &options.node_name)
            .map_err(DriverError::Metadata)?;
        let cloud = CatalogCloud::load(&options.cloud_catalog_path).map_err(DriverError::Cloud)?;
        let resolver = FibreChannel::new()
            .with_device_wait(options.device_wait_attempts, options.device_wait_interval);

        info!(
            node_instance_id = %metadata.node_instance_id(),
            service_instance_id = %metadata.service_instance_id(),
            region = %metadata.region(),
            "Loaded node metadata"
        );

        Ok(Self::new(
            options,
            Arc::new(NodeMounter::new()),
            Arc::new(resolver),
            Arc::new(cloud),
            metadata,
        ))
    }

    /// Validate that a path is safe to use in shell commands.
    /// Returns an error if the path contains dangerous characters.
    fn validate_path(path: &str) -> Result<(), Status> {
        if path.is_empty() {
            return Err(Status::invalid_argument("Path cannot be empty"));
        }

        if !path.starts_with('/') {
            return Err(Status::invalid_argument("Path must be absolute"));
        }

        let dangerous_chars = [
            ';', '|', '&', '$', '`', '(', ')', '{', '}', '<', '>', '\n', '\r',
        ];
        for c in dangerous_chars {
            if path.contains(c) {
                return Err(Status::invalid_argument(format!(
                    "Path contains dangerous character: '{}'",
                    c
                )));
            }
        }

        if path.contains("..") {
            return Err(Status::invalid_argument(
                "Path cannot contain '..' (path traversal)",
            ));
        }

        Ok(())
    }

    /// Check the capability against the supported set.
    ///
    /// Returns the filesystem parameters for a mount volume, `None` for a
    /// block volume.
    fn validate_volume_capability(
        capability: Option<&csi::VolumeCapability>,
    ) -> Result<Option<&csi::volume_capability::MountVolume>, Status> {
        let capability =
            capability.ok_or_else(|| Status::invalid_argument("Volume capability not provided"))?;

        let mode = capability
            .access_mode
            .as_ref()
            .and_then(|m| Mode::try_from(m.mode).ok());
        if !mode.is_some_and(|m| SUPPORTED_ACCESS_MODES.contains(&m)) {
            return Err(Status::invalid_argument(format!(
                "Volume capability not supported: access mode {:?}",
                capability.access_mode.as_ref().map(|m| m.mode)
            )));
        }

        match &capability.access_type {
            Some(AccessType::Block(_)) => Ok(None),
            Some(AccessType::Mount(mount)) => Ok(Some(mount)),
            None => Err(Status::invalid_argument(
                "Volume capability not supported: access type not set",
            )),
        }
    }

    fn fs_type(mount: &csi::volume_capability::MountVolume) -> &str {
        if mount.fs_type.is_empty() {
            DEFAULT_FS_TYPE
        } else {
            &mount.fs_type
        }
    }

    fn wwn(publish_context: &HashMap<String, String>) -> Result<&str, Status> {
        publish_context
            .get(WWN_KEY)
            .map(String::as_str)
            .filter(|w| !w.is_empty())
            .ok_or_else(|| Status::invalid_argument("WWN ID is not provided or empty"))
    }

    fn partition(volume_context: &HashMap<String, String>) -> Result<Partition, Status> {
        match volume_context.get(PARTITION_KEY).filter(|p| !p.is_empty()) {
            None => Ok(Partition::WholeDevice),
            Some(value) => value
                .parse()
                .map_err(|e| Status::invalid_argument(format!("Invalid volume context: {}", e))),
        }
    }

    /// Rescan failures are not fatal: an earlier rescan may already have
    /// surfaced the device.
    fn rescan_bus(&self) {
        if let Err(e) = self.resolver.rescan_bus() {
            warn!(error = %e, "SCSI bus rescan failed, continuing with device lookup");
            metrics::record_rescan_failure();
        }
    }

    fn resolve_device(&self, wwn: &str, partition: Partition) -> Result<String, Status> {
        let device = self
            .resolver
            .resolve_device_path(wwn)
            .map_err(|e| internal(format!("Failed to find device path for WWN {}: {}", wwn, e)))?;
        Ok(partition.device_path(&device))
    }

    /// Remove a half-initialized publish target, folding any cleanup failure
    /// into the original error.
    fn cleanup_target(&self, target: &str, cause: String) -> Status {
        match self.mounter.remove_path(target) {
            Ok(()) => internal(cause),
            Err(e) => internal(format!(
                "{} (failed to remove target {}: {})",
                cause, target, e
            )),
        }
    }

    fn try_start_expand(&self, volume_id: &str) -> Option<ExpandGuard<'_>> {
        let mut expanding = self
            .expanding
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !expanding.insert(volume_id.to_string()) {
            return None;
        }
        Some(ExpandGuard {
            expanding: &self.expanding,
            volume_id: volume_id.to_string(),
        })
    }

    fn stage_volume(
        &self,
        req: csi::NodeStageVolumeRequest,
    ) -> Result<csi::NodeStageVolumeResponse, Status> {
        let volume_id = &req.volume_id;
        let staging_target_path = &req.staging_target_path;

        if volume_id.is_empty() {
            return Err(Status::invalid_argument("Volume ID not provided"));
        }

        if staging_target_path.is_empty() {
            return Err(Status::invalid_argument("Staging target not provided"));
        }

        let mount = Self::validate_volume_capability(req.volume_capability.as_ref())?;
        Self::validate_path(staging_target_path)?;

        info!(
            volume_id = %volume_id,
            staging_target_path = %staging_target_path,
            "NodeStageVolume request"
        );

        let Some(mount) = mount else {
            debug!(volume_id = %volume_id, "Block volume, nothing to stage");
            return Ok(csi::NodeStageVolumeResponse {});
        };

        let wwn = Self::wwn(&req.publish_context)?;
        let partition = Self::partition(&req.volume_context)?;
        let fs_type = Self::fs_type(mount);
        let mut mount_options = Vec::new();
        merge_mount_flags(&mut mount_options, &mount.mount_flags);

        self.rescan_bus();
        let source = self.resolve_device(wwn, partition)?;

        let (mounted_device, _) = self
            .mounter
            .get_device_name(staging_target_path)
            .map_err(|e| {
                internal(format!(
                    "Failed to check if volume is already mounted at {}: {}",
                    staging_target_path, e
                ))
            })?;
        if mounted_device == source {
            info!(
                volume_id = %volume_id,
                staging_target_path = %staging_target_path,
                device = %source,
                "Volume already staged"
            );
            return Ok(csi::NodeStageVolumeResponse {});
        }

        let exists = self.mounter.exists_path(staging_target_path).map_err(|e| {
            internal(format!(
                "Failed to check if staging target {} exists: {}",
                staging_target_path, e
            ))
        })?;
        if !exists {
            self.mounter.make_dir(staging_target_path).map_err(|e| {
                internal(format!(
                    "Could not create staging target {}: {}",
                    staging_target_path, e
                ))
            })?;
        }

        debug!(
            device = %source,
            staging_target_path = %staging_target_path,
            fs_type = %fs_type,
            options = ?mount_options,
            "Formatting and mounting"
        );
        self.mounter
            .format_and_mount(&source, staging_target_path, fs_type, &mount_options)
            .map_err(|e| {
                internal(format!(
                    "Could not format {} and mount it at {}: {}",
                    source, staging_target_path, e
                ))
            })?;

        info!(
            volume_id = %volume_id,
            staging_target_path = %staging_target_path,
            device = %source,
            fs_type = %fs_type,
            "Volume staged successfully"
        );

        Ok(csi::NodeStageVolumeResponse {})
    }

    fn unstage_volume(
        &self,
        req: csi::NodeUnstageVolumeRequest,
    ) -> Result<csi::NodeUnstageVolumeResponse, Status> {
        let volume_id = &req.volume_id;
        let staging_target_path = &req.staging_target_path;

        if volume_id.is_empty() {
            return Err(Status::invalid_argument("Volume ID not provided"));
        }

        if staging_target_path.is_empty() {
            return Err(Status::invalid_argument("Staging target not provided"));
        }

        Self::validate_path(staging_target_path)?;

        info!(
            volume_id = %volume_id,
            staging_target_path = %staging_target_path,
            "NodeUnstageVolume request"
        );

        let (device, ref_count) = self
            .mounter
            .get_device_name(staging_target_path)
            .map_err(|e| {
                internal(format!(
                    "Failed to check if volume is mounted at {}: {}",
                    staging_target_path, e
                ))
            })?;

        if ref_count == 0 {
            info!(
                volume_id = %volume_id,
                staging_target_path = %staging_target_path,
                "Staging target not mounted, nothing to unstage"
            );
            return Ok(csi::NodeUnstageVolumeResponse {});
        }

        if ref_count > 1 {
            warn!(
                device = %device,
                ref_count = ref_count,
                staging_target_path = %staging_target_path,
                "Device is still referenced by other mount points"
            );
        }

        match self.mounter.unmount(staging_target_path) {
            Ok(()) => {}
            Err(PlatformError::NotMounted(_)) => {
                debug!(staging_target_path = %staging_target_path, "Staging target already unmounted");
            }
            Err(e) => {
                return Err(internal(format!(
                    "Could not unmount staging target {}: {}",
                    staging_target_path, e
                )));
            }
        }

        let (detach_target, multipath) = match self.resolver.find_multipath_device(&device) {
            Ok(Some(aggregate)) => {
                info!(device = %device, multipath_device = %aggregate, "Device is part of a multipath map");
                (aggregate, true)
            }
            Ok(None) => (device.clone(), false),
            Err(e) => {
                warn!(error = %e, device = %device, "Could not determine multipath membership, detaching device directly");
                (device.clone(), false)
            }
        };

        self.resolver.detach(&detach_target).map_err(|e| {
            internal(format!("Could not detach device {}: {}", detach_target, e))
        })?;

        if multipath {
            let removed = self.resolver.remove_multipath_device(&detach_target);
            metrics::record_multipath_removal(removed.is_ok());
            removed.map_err(|e| {
                internal(format!(
                    "Could not remove multipath device {}: {}",
                    detach_target, e
                ))
            })?;
        }

        info!(
            volume_id = %volume_id,
            staging_target_path = %staging_target_path,
            device = %detach_target,
            multipath = multipath,
            "Volume unstaged successfully"
        );

        Ok(csi::NodeUnstageVolumeResponse {})
    }

    fn publish_volume(
        &self,
        req: csi::NodePublishVolumeRequest,
    ) -> Result<csi::NodePublishVolumeResponse, Status> {
        let volume_id = &req.volume_id;
        let staging_target_path = &req.staging_target_path;
        let target_path = &req.target_path;

        if volume_id.is_empty() {
            return Err(Status::invalid_argument("Volume ID not provided"));
        }

        if staging_target_path.is_empty() {
            return Err(Status::invalid_argument("Staging target not provided"));
        }

        if target_path.is_empty() {
            return Err(Status::invalid_argument("Target path not provided"));
        }

        let mount = Self::validate_volume_capability(req.volume_capability.as_ref())?;
        Self::validate_path(staging_target_path)?;
        Self::validate_path(target_path)?;

        info!(
            volume_id = %volume_id,
            staging_target_path = %staging_target_path,
            target_path = %target_path,
            readonly = %req.readonly,
            "NodePublishVolume request"
        );

        let mut mount_options = vec!["bind".to_string()];
        if req.readonly {
            mount_options.push("ro".to_string());
        }

        let published = self.mounter.is_mount_point(target_path).map_err(|e| {
            internal(format!(
                "Failed to check if target {} is mounted: {}",
                target_path, e
            ))
        })?;
        if published {
            info!(target_path = %target_path, "Volume already published");
            return Ok(csi::NodePublishVolumeResponse {});
        }

        match mount {
            None => self.publish_block(&req, mount_options)?,
            Some(mount) => self.publish_filesystem(&req, mount, mount_options)?,
        }

        info!(
            volume_id = %volume_id,
            target_path = %target_path,
            "Volume published successfully"
        );

        Ok(csi::NodePublishVolumeResponse {})
    }

    /// Bind-mount the raw device onto a regular file at the target path.
    fn publish_block(
        &self,
        req: &csi::NodePublishVolumeRequest,
        mount_options: Vec<String>,
    ) -> Result<(), Status> {
        let target_path = &req.target_path;
        let wwn = Self::wwn(&req.publish_context)?;
        let partition = Self::partition(&req.volume_context)?;

        // Block volumes skip staging, so the LUN may not have been scanned yet
        self.rescan_bus();
        let source = self.resolve_device(wwn, partition)?;

        if let Some(parent) = Path::new(target_path).parent().and_then(Path::to_str) {
            let exists = self.mounter.exists_path(parent).map_err(|e| {
                internal(format!("Could not check if path {} exists: {}", parent, e))
            })?;
            if !exists {
                self.mounter.make_dir(parent).map_err(|e| {
                    internal(format!("Could not create dir {}: {}", parent, e))
                })?;
            }
        }

        self.mounter.make_file(target_path).map_err(|e| {
            self.cleanup_target(
                target_path,
                format!("Could not create file {}: {}", target_path, e),
            )
        })?;

        debug!(device = %source, target_path = %target_path, options = ?mount_options, "Mounting block device");
        self.mounter
            .mount(&source, target_path, "", &mount_options)
            .map_err(|e| {
                self.cleanup_target(
                    target_path,
                    format!("Could not mount {} at {}: {}", source, target_path, e),
                )
            })
    }

    /// Bind-mount the staging path onto a directory at the target path.
    fn publish_filesystem(
        &self,
        req: &csi::NodePublishVolumeRequest,
        mount: &csi::volume_capability::MountVolume,
        mut mount_options: Vec<String>,
    ) -> Result<(), Status> {
        let source = &req.staging_target_path;
        let target_path = &req.target_path;
        let fs_type = Self::fs_type(mount);
        merge_mount_flags(&mut mount_options, &mount.mount_flags);

        self.mounter.make_dir(target_path).map_err(|e| {
            internal(format!("Could not create dir {}: {}", target_path, e))
        })?;

        debug!(
            source = %source,
            target_path = %target_path,
            fs_type = %fs_type,
            options = ?mount_options,
            "Bind mounting staging target"
        );
        self.mounter
            .mount(source, target_path, fs_type, &mount_options)
            .map_err(|e| {
                self.cleanup_target(
                    target_path,
                    format!("Could not mount {} at {}: {}", source, target_path, e),
                )
            })
    }

    fn unpublish_volume(
        &self,
        req: csi::NodeUnpublishVolumeRequest,
    ) -> Result<csi::NodeUnpublishVolumeResponse, Status> {
        let volume_id = &req.volume_id;
        let target_path = &req.target_path;

        if volume_id.is_empty() {
            return Err(Status::invalid_argument("Volume ID not provided"));
        }

        if target_path.is_empty() {
            return Err(Status::invalid_argument("Target path not provided"));
        }

        Self::validate_path(target_path)?;

        info!(
            volume_id = %volume_id,
            target_path = %target_path,
            "NodeUnpublishVolume request"
        );

        match self.mounter.unmount(target_path) {
            Ok(()) => {}
            Err(PlatformError::NotMounted(_)) => {
                debug!(target_path = %target_path, "Target not mounted");
            }
            Err(e) => {
                return Err(internal(format!(
                    "Could not unmount {:?}: {}",
                    target_path, e
                )));
            }
        }

        if let Err(e) = self.mounter.remove_path(target_path) {
            warn!(error = %e, target_path = %target_path, "Could not remove target path");
        }

        info!(
            volume_id = %volume_id,
            target_path = %target_path,
            "Volume unpublished successfully"
        );

        Ok(csi::NodeUnpublishVolumeResponse {})
    }

    fn expand_volume(
        &self,
        req: csi::NodeExpandVolumeRequest,
    ) -> Result<csi::NodeExpandVolumeResponse, Status> {
        let volume_id = &req.volume_id;
        let volume_path = &req.volume_path;

        if volume_id.is_empty() {
            return Err(Status::invalid_argument("Volume ID not provided"));
        }

        if volume_path.is_empty() {
            return Err(Status::invalid_argument("Volume path not provided"));
        }

        Self::validate_path(volume_path)?;

        let capacity_bytes = req
            .capacity_range
            .as_ref()
            .map(|r| r.required_bytes)
            .unwrap_or(0);

        let _guard = self.try_start_expand(volume_id).ok_or_else(|| {
            Status::aborted(format!(
                "An expand operation for volume {} is already in progress",
                volume_id
            ))
        })?;

        info!(
            volume_id = %volume_id,
            volume_path = %volume_path,
            required_bytes = capacity_bytes,
            "NodeExpandVolume request"
        );

        let is_block = matches!(
            req.volume_capability
                .as_ref()
                .and_then(|c| c.access_type.as_ref()),
            Some(AccessType::Block(_))
        );
        if is_block {
            info!(volume_id = %volume_id, "Block volume, no filesystem to resize");
            return Ok(csi::NodeExpandVolumeResponse { capacity_bytes });
        }

        let device = self.mounter.find_mount_source(volume_path).map_err(|e| {
            internal(format!(
                "Could not determine device path for {}: {}",
                volume_path, e
            ))
        })?;
        if device.is_empty() {
            return Err(internal(format!(
                "Could not get valid device for mount path: {}",
                volume_path
            )));
        }

        let resized = self.mounter.resize(&device, volume_path).map_err(|e| {
            internal(format!(
                "Could not resize volume {} ({}): {}",
                volume_id, device, e
            ))
        })?;

        info!(
            volume_id = %volume_id,
            device = %device,
            resized = resized,
            "Volume expansion completed"
        );

        Ok(csi::NodeExpandVolumeResponse { capacity_bytes })
    }

    fn get_info(&self) -> Result<csi::NodeGetInfoResponse, Status> {
        let instance_id = self.metadata.node_instance_id();

        let instance = self.cloud.get_instance_by_id(instance_id).map_err(|e| {
            internal(format!(
                "Failed to get the instance for node instance ID {}: {}",
                instance_id, e
            ))
        })?;

        let image = self.cloud.get_image_by_id(&instance.image_id).map_err(|e| {
            internal(format!(
                "Failed to get the image details for {}: {}",
                instance.image_id, e
            ))
        })?;

        let segments = HashMap::from([(DISK_TYPE_KEY.to_string(), image.disk_type)]);
        let max_volumes_per_node = self.options.max_volumes_per_node();

        info!(
            node_id = %instance_id,
            max_volumes_per_node = max_volumes_per_node,
            "NodeGetInfo request"
        );

        Ok(csi::NodeGetInfoResponse {
            node_id: instance_id.to_string(),
            max_volumes_per_node,
            accessible_topology: Some(csi::Topology { segments }),
        })
    }
}

#[tonic::async_trait]
impl csi::node_server::Node for NodeService {
    /// Stage a volume: resolve its WWN and format/mount it at the staging path.
    async fn node_stage_volume(
        &self,
        request: Request<csi::NodeStageVolumeRequest>,
    ) -> Result<Response<csi::NodeStageVolumeResponse>, Status> {
        let timer = OperationTimer::new("node_stage_volume");
        let result = self.stage_volume(request.into_inner());
        timer.observe(&result);
        result.map(Response::new)
    }

    /// Unstage a volume: unmount, then detach its SCSI paths and multipath map.
    async fn node_unstage_volume(
        &self,
        request: Request<csi::NodeUnstageVolumeRequest>,
    ) -> Result<Response<csi::NodeUnstageVolumeResponse>, Status> {
        let timer = OperationTimer::new("node_unstage_volume");
        let result = self.unstage_volume(request.into_inner());
        timer.observe(&result);
        result.map(Response::new)
    }

    async fn node_publish_volume(
        &self,
        request: Request<csi::NodePublishVolumeRequest>,
    ) -> Result<Response<csi::NodePublishVolumeResponse>, Status> {
        let timer = OperationTimer::new("node_publish_volume");
        let result = self.publish_volume(request.into_inner());
        timer.observe(&result);
        result.map(Response::new)
    }

    async fn node_unpublish_volume(
        &self,
        request: Request<csi::NodeUnpublishVolumeRequest>,
    ) -> Result<Response<csi::NodeUnpublishVolumeResponse>, Status> {
        let timer = OperationTimer::new("node_unpublish_volume");
        let result = self.unpublish_volume(request.into_inner());
        timer.observe(&result);
        result.map(Response::new)
    }

    /// Get information about this node.
    async fn node_get_info(
        &self,
        _request: Request<csi::NodeGetInfoRequest>,
    ) -> Result<Response<csi::NodeGetInfoResponse>, Status> {
        let timer = OperationTimer::new("node_get_info");
        let result = self.get_info();
        timer.observe(&result);
        result.map(Response::new)
    }

    /// Report node capabilities.
    async fn node_get_capabilities(
        &self,
        _request: Request<csi::NodeGetCapabilitiesRequest>,
    ) -> Result<Response<csi::NodeGetCapabilitiesResponse>, Status> {
        let capabilities = NODE_CAPABILITIES
            .iter()
            .map(|rpc| csi::NodeServiceCapability {
                r#type: Some(csi::node_service_capability::Type::Rpc(
                    csi::node_service_capability::Rpc {
                        r#type: *rpc as i32,
                    },
                )),
            })
            .collect();

        Ok(Response::new(csi::NodeGetCapabilitiesResponse {
            capabilities,
        }))
    }

    /// Grow the filesystem of a mounted volume to the size of its device.
    async fn node_expand_volume(
        &self,
        request: Request<csi::NodeExpandVolumeRequest>,
    ) -> Result<Response<csi::NodeExpandVolumeResponse>, Status> {
        let timer = OperationTimer::new("node_expand_volume");
        let result = self.expand_volume(request.into_inner());
        timer.observe(&result);
        result.map(Response::new)
    }

    /// Get volume statistics (not implemented).
    async fn node_get_volume_stats(
        &self,
        _request: Request<csi::NodeGetVolumeStatsRequest>,
    ) -> Result<Response<csi::NodeGetVolumeStatsResponse>, Status> {
        Err(Status::unimplemented("NodeGetVolumeStats is not implemented yet"))
    }
}

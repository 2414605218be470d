//! Recording fake of the host for NodeService tests.
//!
//! One `FakeHost` implements both `Mounter` and `DeviceResolver` and logs
//! every call in order to a shared list, so tests can assert on the exact
//! sequence of host operations a request caused.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

use csi_driver::cloud::{CatalogCloud, Image, Instance, Metadata};
use csi_driver::csi;
use csi_driver::platform::{DeviceResolver, Mounter, PlatformError, PlatformResult};
use csi_driver::{DriverOptions, NodeService};

pub const NODE_INSTANCE_ID: &str = "7f2a1c3e-node";
pub const IMAGE_ID: &str = "rhcos-414";
pub const DISK_TYPE: &str = "tier1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    RescanBus,
    ResolveDevicePath(String),
    FindMultipathDevice(String),
    Detach(String),
    RemoveMultipathDevice(String),
    ExistsPath(String),
    MakeDir(String),
    MakeFile(String),
    RemovePath(String),
    IsMountPoint(String),
    GetDeviceName(String),
    FormatAndMount {
        source: String,
        target: String,
        fs_type: String,
        options: Vec<String>,
    },
    Mount {
        source: String,
        target: String,
        fs_type: String,
        options: Vec<String>,
    },
    Unmount(String),
    FindMountSource(String),
    Resize {
        device: String,
        mount_path: String,
    },
}

/// Host state the fake consults and mutates.
#[derive(Default)]
pub struct HostState {
    /// WWN (as passed in the publish context) -> device path
    pub devices: HashMap<String, String>,
    /// Mount point -> mounted device
    pub mounts: HashMap<String, String>,
    /// Path device -> multipath aggregate
    pub multipath: HashMap<String, String>,
    pub paths: HashSet<String>,
    pub fail_rescan: bool,
    pub fail_mount: Option<String>,
    pub fail_unmount: Option<String>,
    pub fail_detach: bool,
    pub fail_multipath_lookup: bool,
    pub fail_resize: bool,
}

/// Pauses `resize` until the test lets it continue.
struct ResizeGate {
    started: Sender<()>,
    release: Receiver<()>,
}

#[derive(Default)]
pub struct FakeHost {
    calls: Mutex<Vec<Call>>,
    state: Mutex<HostState>,
    resize_gate: Mutex<Option<ResizeGate>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_state(f: impl FnOnce(&mut HostState)) -> Arc<Self> {
        let host = Self::default();
        f(&mut host.state.lock().unwrap());
        Arc::new(host)
    }

    pub fn update(&self, f: impl FnOnce(&mut HostState)) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn mounted_at(&self, path: &str) -> Option<String> {
        self.state.lock().unwrap().mounts.get(path).cloned()
    }

    pub fn path_exists(&self, path: &str) -> bool {
        self.state.lock().unwrap().paths.contains(path)
    }

    /// Block the next `resize` until a message arrives on `release`.
    pub fn gate_resize(&self, started: Sender<()>, release: Receiver<()>) {
        *self.resize_gate.lock().unwrap() = Some(ResizeGate { started, release });
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn command_failed(command: &str, stderr: &str) -> PlatformError {
    PlatformError::CommandFailed {
        command: command.to_string(),
        code: Some(32),
        stderr: stderr.to_string(),
    }
}

impl Mounter for FakeHost {
    fn exists_path(&self, path: &str) -> PlatformResult<bool> {
        self.record(Call::ExistsPath(path.to_string()));
        let state = self.state.lock().unwrap();
        Ok(state.paths.contains(path) || state.mounts.contains_key(path))
    }

    fn make_dir(&self, path: &str) -> PlatformResult<()> {
        self.record(Call::MakeDir(path.to_string()));
        self.state.lock().unwrap().paths.insert(path.to_string());
        Ok(())
    }

    fn make_file(&self, path: &str) -> PlatformResult<()> {
        self.record(Call::MakeFile(path.to_string()));
        self.state.lock().unwrap().paths.insert(path.to_string());
        Ok(())
    }

    fn remove_path(&self, path: &str) -> PlatformResult<()> {
        self.record(Call::RemovePath(path.to_string()));
        self.state.lock().unwrap().paths.remove(path);
        Ok(())
    }

    fn is_mount_point(&self, path: &str) -> PlatformResult<bool> {
        self.record(Call::IsMountPoint(path.to_string()));
        Ok(self.state.lock().unwrap().mounts.contains_key(path))
    }

    fn get_device_name(&self, mount_path: &str) -> PlatformResult<(String, usize)> {
        self.record(Call::GetDeviceName(mount_path.to_string()));
        let state = self.state.lock().unwrap();
        let Some(device) = state.mounts.get(mount_path) else {
            return Ok((String::new(), 0));
        };
        let refs = state.mounts.values().filter(|d| *d == device).count();
        Ok((device.clone(), refs))
    }

    fn format_and_mount(
        &self,
        source: &str,
        target: &str,
        fs_type: &str,
        options: &[String],
    ) -> PlatformResult<()> {
        self.record(Call::FormatAndMount {
            source: source.to_string(),
            target: target.to_string(),
            fs_type: fs_type.to_string(),
            options: options.to_vec(),
        });
        let mut state = self.state.lock().unwrap();
        if let Some(stderr) = &state.fail_mount {
            return Err(command_failed("mount", stderr));
        }
        state.mounts.insert(target.to_string(), source.to_string());
        Ok(())
    }

    fn mount(
        &self,
        source: &str,
        target: &str,
        fs_type: &str,
        options: &[String],
    ) -> PlatformResult<()> {
        self.record(Call::Mount {
            source: source.to_string(),
            target: target.to_string(),
            fs_type: fs_type.to_string(),
            options: options.to_vec(),
        });
        let mut state = self.state.lock().unwrap();
        if let Some(stderr) = &state.fail_mount {
            return Err(command_failed("mount", stderr));
        }
        state.mounts.insert(target.to_string(), source.to_string());
        Ok(())
    }

    fn unmount(&self, target: &str) -> PlatformResult<()> {
        self.record(Call::Unmount(target.to_string()));
        let mut state = self.state.lock().unwrap();
        if let Some(stderr) = &state.fail_unmount {
            return Err(command_failed("umount", stderr));
        }
        match state.mounts.remove(target) {
            Some(_) => Ok(()),
            None => Err(PlatformError::NotMounted(target.to_string())),
        }
    }

    fn find_mount_source(&self, path: &str) -> PlatformResult<String> {
        self.record(Call::FindMountSource(path.to_string()));
        self.state
            .lock()
            .unwrap()
            .mounts
            .get(path)
            .cloned()
            .ok_or_else(|| command_failed("findmnt", ""))
    }

    fn resize(&self, device: &str, mount_path: &str) -> PlatformResult<bool> {
        self.record(Call::Resize {
            device: device.to_string(),
            mount_path: mount_path.to_string(),
        });
        let gate = self.resize_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.started.send(()).unwrap();
            gate.release.recv().unwrap();
        }
        if self.state.lock().unwrap().fail_resize {
            return Err(command_failed("resize2fs", "Bad magic number in super-block"));
        }
        Ok(true)
    }
}

impl DeviceResolver for FakeHost {
    fn rescan_bus(&self) -> PlatformResult<()> {
        self.record(Call::RescanBus);
        if self.state.lock().unwrap().fail_rescan {
            return Err(PlatformError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "scan: permission denied",
            )));
        }
        Ok(())
    }

    fn resolve_device_path(&self, wwn: &str) -> PlatformResult<String> {
        self.record(Call::ResolveDevicePath(wwn.to_string()));
        self.state
            .lock()
            .unwrap()
            .devices
            .get(wwn)
            .cloned()
            .ok_or_else(|| PlatformError::DeviceNotFound(wwn.to_string()))
    }

    fn find_multipath_device(&self, device: &str) -> PlatformResult<Option<String>> {
        self.record(Call::FindMultipathDevice(device.to_string()));
        let state = self.state.lock().unwrap();
        if state.fail_multipath_lookup {
            return Err(PlatformError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such device",
            )));
        }
        if state.multipath.values().any(|m| m == device) {
            return Ok(Some(device.to_string()));
        }
        Ok(state.multipath.get(device).cloned())
    }

    fn detach(&self, device: &str) -> PlatformResult<()> {
        self.record(Call::Detach(device.to_string()));
        if self.state.lock().unwrap().fail_detach {
            return Err(PlatformError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "delete: permission denied",
            )));
        }
        Ok(())
    }

    fn remove_multipath_device(&self, map: &str) -> PlatformResult<()> {
        self.record(Call::RemoveMultipathDevice(map.to_string()));
        Ok(())
    }
}

pub fn catalog() -> CatalogCloud {
    CatalogCloud::new(
        vec![Instance {
            id: NODE_INSTANCE_ID.to_string(),
            name: "worker-0".to_string(),
            image_id: IMAGE_ID.to_string(),
        }],
        vec![Image {
            id: IMAGE_ID.to_string(),
            name: "rhcos-414".to_string(),
            disk_type: DISK_TYPE.to_string(),
        }],
    )
}

pub fn node_service(host: &Arc<FakeHost>) -> NodeService {
    node_service_with(host, DriverOptions::default(), NODE_INSTANCE_ID)
}

pub fn node_service_with(
    host: &Arc<FakeHost>,
    options: DriverOptions,
    node_instance_id: &str,
) -> NodeService {
    NodeService::new(
        options,
        host.clone(),
        host.clone(),
        Arc::new(catalog()),
        Metadata::new("svc-instance", node_instance_id, "lon"),
    )
}

// ============================================================================
// Request builders
// ============================================================================

pub fn mount_capability(fs_type: &str, flags: &[&str]) -> csi::VolumeCapability {
    csi::VolumeCapability {
        access_type: Some(csi::volume_capability::AccessType::Mount(
            csi::volume_capability::MountVolume {
                fs_type: fs_type.to_string(),
                mount_flags: flags.iter().map(|f| f.to_string()).collect(),
                ..Default::default()
            },
        )),
        access_mode: Some(csi::volume_capability::AccessMode {
            mode: csi::volume_capability::access_mode::Mode::SingleNodeWriter as i32,
        }),
    }
}

pub fn block_capability() -> csi::VolumeCapability {
    csi::VolumeCapability {
        access_type: Some(csi::volume_capability::AccessType::Block(
            csi::volume_capability::BlockVolume {},
        )),
        access_mode: Some(csi::volume_capability::AccessMode {
            mode: csi::volume_capability::access_mode::Mode::SingleNodeWriter as i32,
        }),
    }
}

pub fn wwn_context(wwn: &str) -> HashMap<String, String> {
    HashMap::from([("WWN".to_string(), wwn.to_string())])
}

pub fn stage_request(
    volume_id: &str,
    staging_path: &str,
    capability: Option<csi::VolumeCapability>,
    publish_context: HashMap<String, String>,
) -> csi::NodeStageVolumeRequest {
    csi::NodeStageVolumeRequest {
        volume_id: volume_id.to_string(),
        publish_context,
        staging_target_path: staging_path.to_string(),
        volume_capability: capability,
        ..Default::default()
    }
}

pub fn publish_request(
    volume_id: &str,
    staging_path: &str,
    target_path: &str,
    capability: csi::VolumeCapability,
    readonly: bool,
) -> csi::NodePublishVolumeRequest {
    csi::NodePublishVolumeRequest {
        volume_id: volume_id.to_string(),
        staging_target_path: staging_path.to_string(),
        target_path: target_path.to_string(),
        volume_capability: Some(capability),
        readonly,
        ..Default::default()
    }
}

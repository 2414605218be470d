//! Fibre Channel device resolution for Linux
//!
//! FC LUN device names (`sdX`) change across attach cycles; only the WWN is
//! stable. The WWN is matched against the udev links in `/dev/disk/by-id`,
//! and multipath membership is read from the device-mapper entries in
//! `/sys/block`.
//!
//! Teardown works on the kernel device tree directly:
//! - `/sys/block/<disk>/device/delete` removes a SCSI path
//! - `multipath -f` flushes the aggregate map once its paths are gone

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::{DeviceResolver, PlatformError, PlatformResult, run_command};
use crate::types::Wwn;

const DEFAULT_WAIT_ATTEMPTS: u32 = 5;
const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_secs(1);

/// Fibre Channel resolver rooted at the host `/dev` and `/sys` trees.
#[derive(Debug, Clone)]
pub struct FibreChannel {
    dev_root: PathBuf,
    sys_root: PathBuf,
    wait_attempts: u32,
    wait_interval: Duration,
}

impl FibreChannel {
    pub fn new() -> Self {
        Self::with_roots("/dev", "/sys")
    }

    /// Use alternate `/dev` and `/sys` roots.
    pub fn with_roots(dev_root: impl Into<PathBuf>, sys_root: impl Into<PathBuf>) -> Self {
        Self {
            dev_root: dev_root.into(),
            sys_root: sys_root.into(),
            wait_attempts: DEFAULT_WAIT_ATTEMPTS,
            wait_interval: DEFAULT_WAIT_INTERVAL,
        }
    }

    /// How long `resolve_device_path` polls for a device link to appear.
    ///
    /// Polling sleeps on the calling thread, so a missing WWN holds a runtime
    /// worker for up to `attempts * interval`.
    pub fn with_device_wait(mut self, attempts: u32, interval: Duration) -> Self {
        self.wait_attempts = attempts.max(1);
        self.wait_interval = interval;
        self
    }

    fn sys_block(&self, name: &str) -> PathBuf {
        self.sys_root.join("block").join(name)
    }

    fn mapper_path(&self, map: &str) -> String {
        self.dev_root
            .join("mapper")
            .join(map)
            .to_string_lossy()
            .into_owned()
    }

    /// Look up the by-id link for a WWN.
    ///
    /// The multipath uuid link is preferred over the per-path links so an
    /// aggregate is used when one exists. Partition links (`-partN`) never
    /// match since names are compared exactly.
    fn find_by_id(&self, wwn: &Wwn) -> Option<PathBuf> {
        let by_id = self.dev_root.join("disk").join("by-id");
        let candidates = [
            format!("dm-uuid-mpath-3{}", wwn),
            format!("wwn-0x{}", wwn),
            format!("scsi-3{}", wwn),
        ];

        let entries: Vec<(String, PathBuf)> = fs::read_dir(&by_id)
            .ok()?
            .flatten()
            .map(|e| (e.file_name().to_string_lossy().to_lowercase(), e.path()))
            .collect();

        candidates.iter().find_map(|c| {
            entries
                .iter()
                .find(|(name, _)| name == c)
                .map(|(_, path)| path.clone())
        })
    }

    /// Kernel name (`sdb`, `dm-3`) of a device path, following symlinks.
    fn kernel_name(device: &str) -> PlatformResult<String> {
        let canonical = fs::canonicalize(device)?;
        canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PlatformError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("{} has no device name", device),
                ))
            })
    }

    /// Map name of a dm device if it is a multipath map.
    fn multipath_map_name(&self, dm_name: &str) -> Option<String> {
        let dm = self.sys_block(dm_name).join("dm");
        let uuid = fs::read_to_string(dm.join("uuid")).ok()?;
        if !uuid.trim().starts_with("mpath-") {
            return None;
        }
        fs::read_to_string(dm.join("name"))
            .ok()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    }

    /// Whole-disk name for a partition (`sdb1` -> `sdb`), or the name itself.
    fn parent_disk(&self, name: &str) -> String {
        let class_entry = self.sys_root.join("class").join("block").join(name);
        if class_entry.join("partition").exists()
            && let Ok(canonical) = fs::canonicalize(&class_entry)
            && let Some(parent) = canonical.parent().and_then(Path::file_name)
        {
            return parent.to_string_lossy().into_owned();
        }
        name.to_string()
    }

    fn delete_scsi_device(&self, disk: &str) -> PlatformResult<()> {
        let delete = self.sys_block(disk).join("device").join("delete");
        info!(disk = %disk, "Deleting SCSI device");
        fs::write(&delete, "1").map_err(|e| {
            warn!(error = %e, path = %delete.display(), "Failed to delete SCSI device");
            PlatformError::Io(e)
        })
    }

    fn flush_buffers(device: &str) {
        if let Err(e) = run_command("blockdev", &["--flushbufs", device]) {
            warn!(error = %e, device = %device, "Failed to flush device buffers, continuing with detach");
        }
    }
}

impl Default for FibreChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceResolver for FibreChannel {
    fn rescan_bus(&self) -> PlatformResult<()> {
        let hosts = self.sys_root.join("class").join("scsi_host");
        let mut last_error = None;

        for entry in fs::read_dir(&hosts)?.flatten() {
            let scan = entry.path().join("scan");
            // Wildcard channel, target and LUN
            match fs::write(&scan, "- - -") {
                Ok(()) => debug!(host = %entry.file_name().to_string_lossy(), "Rescanned SCSI host"),
                Err(e) => {
                    warn!(error = %e, path = %scan.display(), "Failed to rescan SCSI host");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(PlatformError::Io(e)),
            None => Ok(()),
        }
    }

    /// Polls `/dev/disk/by-id` with a blocking sleep between attempts; the
    /// RPC's worker thread is stalled for the whole wait.
    fn resolve_device_path(&self, wwn: &str) -> PlatformResult<String> {
        let wwn: Wwn = wwn
            .parse()
            .map_err(|_| PlatformError::DeviceNotFound(wwn.to_string()))?;

        for attempt in 1..=self.wait_attempts {
            if let Some(link) = self.find_by_id(&wwn) {
                let name = Self::kernel_name(&link.to_string_lossy())?;
                let device = self.dev_root.join(&name).to_string_lossy().into_owned();

                if let Some(aggregate) = self.find_multipath_device(&device)? {
                    info!(wwn = %wwn, device = %device, multipath = %aggregate, "Device is multipathed, using dm device");
                    return Ok(aggregate);
                }

                debug!(wwn = %wwn, device = %device, "Resolved WWN to device");
                return Ok(device);
            }

            if attempt < self.wait_attempts {
                debug!(wwn = %wwn, attempt = attempt, "Device link not present yet, waiting");
                thread::sleep(self.wait_interval);
            }
        }

        Err(PlatformError::DeviceNotFound(wwn.to_string()))
    }

    fn find_multipath_device(&self, device: &str) -> PlatformResult<Option<String>> {
        let name = Self::kernel_name(device)?;

        if name.starts_with("dm-") {
            if let Some(map) = self.multipath_map_name(&name) {
                return Ok(Some(self.mapper_path(&map)));
            }
            // kpartx partition maps sit on top of the multipath map
            let slaves = self.sys_block(&name).join("slaves");
            let Ok(entries) = fs::read_dir(&slaves) else {
                return Ok(None);
            };
            for entry in entries.flatten() {
                let slave = entry.file_name().to_string_lossy().into_owned();
                if let Some(map) = self.multipath_map_name(&slave) {
                    return Ok(Some(self.mapper_path(&map)));
                }
            }
            return Ok(None);
        }

        let disk = self.parent_disk(&name);
        let holders = self.sys_block(&disk).join("holders");
        let Ok(entries) = fs::read_dir(&holders) else {
            return Ok(None);
        };

        for entry in entries.flatten() {
            let holder = entry.file_name().to_string_lossy().into_owned();
            if holder.starts_with("dm-")
                && let Some(map) = self.multipath_map_name(&holder)
            {
                return Ok(Some(self.mapper_path(&map)));
            }
        }

        Ok(None)
    }

    fn detach(&self, device: &str) -> PlatformResult<()> {
        let name = Self::kernel_name(device)?;
        Self::flush_buffers(device);

        if name.starts_with("dm-") {
            let slaves: Vec<String> = fs::read_dir(self.sys_block(&name).join("slaves"))?
                .flatten()
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect();

            if slaves.is_empty() {
                warn!(device = %device, "Multipath device has no paths left");
            }
            for slave in &slaves {
                self.delete_scsi_device(slave)?;
            }
            return Ok(());
        }

        self.delete_scsi_device(&self.parent_disk(&name))
    }

    fn remove_multipath_device(&self, map: &str) -> PlatformResult<()> {
        info!(map = %map, "Flushing multipath map");
        run_command("multipath", &["-f", map])?;
        Ok(())
    }
}

//! Linux mount primitives
//!
//! Uses Linux-specific tools:
//! - /proc/mounts (through proc-mounts) for mount point and reference count queries
//! - blkid for filesystem detection
//! - mkfs.ext4/mkfs.xfs for formatting
//! - mount/umount/findmnt
//! - resize2fs/xfs_growfs for online expansion

use std::fs::{self, OpenOptions};
use std::path::PathBuf;

use proc_mounts::{MountInfo, MountIter};
use tracing::{debug, error, info, warn};

use super::{Mounter, PlatformError, PlatformResult, run_command};

const PROC_MOUNTS: &str = "/proc/mounts";

/// blkid low-level probe exit status when no signature was found
const BLKID_NO_SIGNATURE: i32 = 2;

/// Mounter backed by the Linux mount table and mount utilities.
#[derive(Debug, Clone)]
pub struct NodeMounter {
    mount_table: PathBuf,
    tool_dir: Option<PathBuf>,
}

impl NodeMounter {
    pub fn new() -> Self {
        Self::with_mount_table(PROC_MOUNTS)
    }

    /// Read mounts from an alternate table (tests, chroots).
    pub fn with_mount_table(path: impl Into<PathBuf>) -> Self {
        Self {
            mount_table: path.into(),
            tool_dir: None,
        }
    }

    /// Run blkid, mkfs and mount utilities from `dir` instead of `PATH`.
    pub fn with_tool_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.tool_dir = Some(dir.into());
        self
    }

    fn tool(&self, name: &str) -> String {
        match &self.tool_dir {
            Some(dir) => dir.join(name).to_string_lossy().into_owned(),
            None => name.to_string(),
        }
    }

    fn mounts(&self) -> PlatformResult<Vec<MountInfo>> {
        let iter = MountIter::new_from_file(&self.mount_table).map_err(|e| {
            error!(error = %e, path = %self.mount_table.display(), "Failed to read mount table");
            PlatformError::Io(e)
        })?;
        Ok(iter.flatten().collect())
    }

    /// Form of `path` as the kernel lists it in the mount table.
    ///
    /// Symlinks are resolved when the path exists. `Path` equality already
    /// ignores trailing and repeated separators.
    fn kernel_path(path: &str) -> PathBuf {
        fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path))
    }

    /// Check if a device needs formatting (has no valid filesystem).
    ///
    /// Only blkid's "nothing found" status means unformatted; an ambivalent
    /// probe or an I/O error is returned to the caller.
    fn needs_formatting(&self, device: &str) -> PlatformResult<bool> {
        match run_command(&self.tool("blkid"), &["-p", device]) {
            Ok(stdout) => Ok(!stdout.contains("TYPE=")),
            Err(PlatformError::CommandFailed {
                code: Some(BLKID_NO_SIGNATURE),
                ..
            }) => Ok(true),
            Err(e) => {
                error!(device = %device, error = %e, "Could not determine whether device is formatted");
                Err(e)
            }
        }
    }

    fn filesystem_type(&self, device: &str) -> PlatformResult<String> {
        let stdout = run_command(
            &self.tool("blkid"),
            &["-p", "-s", "TYPE", "-o", "value", device],
        )?;
        Ok(stdout.trim().to_string())
    }

    fn format_device(&self, device: &str, fs_type: &str) -> PlatformResult<()> {
        info!(device = %device, fs_type = %fs_type, "Formatting device");

        match fs_type {
            "ext2" | "ext3" | "ext4" => {
                // -F to force (don't prompt)
                run_command(&self.tool(&format!("mkfs.{}", fs_type)), &["-F", device])?;
            }
            "xfs" => {
                run_command(&self.tool("mkfs.xfs"), &["-f", device])?;
            }
            other => return Err(PlatformError::UnsupportedFilesystem(other.to_string())),
        }

        Ok(())
    }
}

impl Default for NodeMounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Mounter for NodeMounter {
    fn exists_path(&self, path: &str) -> PlatformResult<bool> {
        match fs::symlink_metadata(path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn make_dir(&self, path: &str) -> PlatformResult<()> {
        debug!(path = %path, "Creating directory");
        fs::create_dir_all(path)?;
        Ok(())
    }

    fn make_file(&self, path: &str) -> PlatformResult<()> {
        debug!(path = %path, "Creating file");
        OpenOptions::new().create(true).append(true).open(path)?;
        Ok(())
    }

    fn remove_path(&self, path: &str) -> PlatformResult<()> {
        let metadata = match fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        if metadata.is_dir() {
            fs::remove_dir(path)?;
        } else {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn is_mount_point(&self, path: &str) -> PlatformResult<bool> {
        let path = Self::kernel_path(path);
        Ok(self.mounts()?.iter().any(|m| m.dest == path))
    }

    fn get_device_name(&self, mount_path: &str) -> PlatformResult<(String, usize)> {
        let mount_path = Self::kernel_path(mount_path);
        let mounts = self.mounts()?;

        // Last entry wins when mounts are stacked on the same point
        let Some(device) = mounts
            .iter()
            .rev()
            .find(|m| m.dest == mount_path)
            .map(|m| m.source.clone())
        else {
            return Ok((String::new(), 0));
        };

        let ref_count = mounts.iter().filter(|m| m.source == device).count();
        Ok((device.to_string_lossy().into_owned(), ref_count))
    }

    fn format_and_mount(
        &self,
        source: &str,
        target: &str,
        fs_type: &str,
        options: &[String],
    ) -> PlatformResult<()> {
        if self.needs_formatting(source)? {
            self.format_device(source, fs_type)?;
        } else {
            debug!(device = %source, "Device already carries a filesystem, skipping format");
        }

        self.mount(source, target, fs_type, options)
    }

    fn mount(
        &self,
        source: &str,
        target: &str,
        fs_type: &str,
        options: &[String],
    ) -> PlatformResult<()> {
        info!(source = %source, target = %target, fs_type = %fs_type, options = ?options, "Mounting");

        let joined = options.join(",");
        let mut args: Vec<&str> = Vec::new();
        if !fs_type.is_empty() {
            args.extend(["-t", fs_type]);
        }
        if !joined.is_empty() {
            args.extend(["-o", joined.as_str()]);
        }
        args.extend([source, target]);

        run_command(&self.tool("mount"), &args)?;
        Ok(())
    }

    fn unmount(&self, target: &str) -> PlatformResult<()> {
        info!(target = %target, "Unmounting");

        // umount resolves the path itself, so it is not checked against the table first
        match run_command(&self.tool("umount"), &[target]) {
            Ok(_) => Ok(()),
            Err(PlatformError::CommandFailed { stderr, .. })
                if stderr.contains("not mounted") || stderr.contains("no mount point") =>
            {
                warn!(target = %target, "Path was not mounted");
                Err(PlatformError::NotMounted(target.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    fn find_mount_source(&self, path: &str) -> PlatformResult<String> {
        let stdout = run_command(
            &self.tool("findmnt"),
            &["-o", "source", "--noheadings", "--target", path],
        )?;
        Ok(stdout.trim().to_string())
    }

    fn resize(&self, device: &str, mount_path: &str) -> PlatformResult<bool> {
        let fs_type = self.filesystem_type(device)?;
        info!(device = %device, mount_path = %mount_path, fs_type = %fs_type, "Resizing filesystem");

        match fs_type.as_str() {
            "ext2" | "ext3" | "ext4" => {
                run_command(&self.tool("resize2fs"), &[device])?;
            }
            "xfs" => {
                // xfs_growfs operates on the mount point, not the device
                run_command(&self.tool("xfs_growfs"), &[mount_path])?;
            }
            other => return Err(PlatformError::UnsupportedFilesystem(other.to_string())),
        }

        Ok(true)
    }
}

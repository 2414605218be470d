//! Host primitives for the CSI Node service
//!
//! The node service never touches the OS directly. It talks to two
//! collaborators:
//! - [`Mounter`]: filesystem paths, the mount table, format/mount/resize
//! - [`DeviceResolver`]: the Fibre Channel SCSI layer (WWN lookup,
//!   multipath discovery, logical detach)
//!
//! Linux implementations are [`NodeMounter`] and [`FibreChannel`].
//!
//! # Usage
//!
//! ```ignore
//! use crate::platform::{DeviceResolver, FibreChannel};
//!
//! let fc = FibreChannel::new();
//! fc.rescan_bus()?;
//! let device = fc.resolve_device_path("0x600507681081818b3000000000001a2b")?;
//! ```

mod error;
mod fibrechannel;
mod mount;

use std::process::Command;

use tracing::error;

pub use error::{PlatformError, PlatformResult};
pub use fibrechannel::FibreChannel;
pub use mount::NodeMounter;

/// Default filesystem type when a mount capability leaves it unset
pub const DEFAULT_FS_TYPE: &str = "ext4";

/// Mount, format and path primitives over the host filesystem.
///
/// All methods block; callers run them inline on the RPC task.
pub trait Mounter: Send + Sync {
    fn exists_path(&self, path: &str) -> PlatformResult<bool>;

    /// Create a directory (and parents).
    fn make_dir(&self, path: &str) -> PlatformResult<()>;

    /// Create an empty regular file, used as a bind target for raw devices.
    fn make_file(&self, path: &str) -> PlatformResult<()>;

    /// Remove a file or an empty directory. Missing paths are not an error.
    fn remove_path(&self, path: &str) -> PlatformResult<()>;

    fn is_mount_point(&self, path: &str) -> PlatformResult<bool>;

    /// Device mounted at `mount_path` and how many mount points reference it.
    ///
    /// Returns `("", 0)` when nothing is mounted there.
    fn get_device_name(&self, mount_path: &str) -> PlatformResult<(String, usize)>;

    /// Format `source` only if it carries no filesystem, then mount it.
    fn format_and_mount(
        &self,
        source: &str,
        target: &str,
        fs_type: &str,
        options: &[String],
    ) -> PlatformResult<()>;

    fn mount(
        &self,
        source: &str,
        target: &str,
        fs_type: &str,
        options: &[String],
    ) -> PlatformResult<()>;

    /// Unmount `target`. Returns [`PlatformError::NotMounted`] if umount reports it is not a mount point.
    fn unmount(&self, target: &str) -> PlatformResult<()>;

    /// Source device of the mount at `path`, from a live mount table query.
    fn find_mount_source(&self, path: &str) -> PlatformResult<String>;

    /// Grow the filesystem on `device` (mounted at `mount_path`) to fill it.
    ///
    /// Returns true if a resize was performed.
    fn resize(&self, device: &str, mount_path: &str) -> PlatformResult<bool>;
}

/// Fibre Channel device resolution and teardown.
pub trait DeviceResolver: Send + Sync {
    /// Ask the SCSI hosts to re-enumerate targets and LUNs.
    fn rescan_bus(&self) -> PlatformResult<()>;

    /// Map a World Wide Name to a host device path.
    fn resolve_device_path(&self, wwn: &str) -> PlatformResult<String>;

    /// Multipath aggregate that `device` belongs to (or is), if any.
    fn find_multipath_device(&self, device: &str) -> PlatformResult<Option<String>>;

    /// Remove the device (or every path under an aggregate) from the kernel device tree.
    fn detach(&self, device: &str) -> PlatformResult<()>;

    /// Flush the multipath map. Only valid once every path has been detached.
    fn remove_multipath_device(&self, map: &str) -> PlatformResult<()>;
}

/// Run a host command and return its stdout, mapping spawn and exit failures.
pub(crate) fn run_command(program: &str, args: &[&str]) -> PlatformResult<String> {
    let output = Command::new(program).args(args).output().map_err(|e| {
        error!(error = %e, command = %program, "Failed to execute command");
        PlatformError::CommandExec {
            command: program.to_string(),
            source: e,
        }
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        error!(command = %program, args = ?args, code = ?output.status.code(), stderr = %stderr, "Command failed");
        return Err(PlatformError::CommandFailed {
            command: program.to_string(),
            code: output.status.code(),
            stderr,
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

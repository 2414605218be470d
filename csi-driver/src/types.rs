//! Type-safe wrappers for CSI request parameters.
//!
//! These types provide compile-time safety for values that arrive as free
//! strings in the publish and volume contexts. Each type implements
//! `FromStr` for parsing at the API boundary.

use std::fmt::{self, Display};
use std::str::FromStr;

/// Publish context key carrying the Fibre Channel WWN of the attached volume
pub const WWN_KEY: &str = "WWN";

/// Volume context key selecting a partition of the volume
pub const PARTITION_KEY: &str = "partition";

// ============================================================================
// Wwn
// ============================================================================

/// Fibre Channel World Wide Name.
///
/// Stored normalized: lowercase, without a leading `0x`. This is the form
/// udev uses in `/dev/disk/by-id` link names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wwn(String);

impl Wwn {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Wwn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Wwn {
    type Err = WwnParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();
        let bare = lower.strip_prefix("0x").unwrap_or(&lower);
        if bare.is_empty() {
            return Err(WwnParseError(s.to_string()));
        }
        Ok(Wwn(bare.to_string()))
    }
}

/// Error returned when parsing an empty WWN.
#[derive(Debug, Clone)]
pub struct WwnParseError(String);

impl Display for WwnParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid WWN '{}': value is empty", self.0)
    }
}

impl std::error::Error for WwnParseError {}

// ============================================================================
// Partition
// ============================================================================

/// Partition selector from the volume context.
///
/// `"0"` selects the whole device, same as leaving the key out. Any other
/// value must be a positive integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partition {
    #[default]
    WholeDevice,
    Number(u32),
}

impl Partition {
    /// Device path of this partition on `device`.
    ///
    /// Follows the kernel and udev naming rules:
    /// - `/dev/sdb` -> `/dev/sdb1`
    /// - names ending in a digit (`/dev/nvme0n1`) -> `/dev/nvme0n1p1`
    /// - multipath maps (`/dev/mapper/mpatha`) -> `/dev/mapper/mpatha-part1`
    pub fn device_path(self, device: &str) -> String {
        match self {
            Partition::WholeDevice => device.to_string(),
            Partition::Number(n) if device.contains("/mapper/") => {
                format!("{}-part{}", device, n)
            }
            Partition::Number(n) if device.ends_with(|c: char| c.is_ascii_digit()) => {
                format!("{}p{}", device, n)
            }
            Partition::Number(n) => format!("{}{}", device, n),
        }
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Partition::WholeDevice => write!(f, "0"),
            Partition::Number(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for Partition {
    type Err = PartitionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u32>() {
            Ok(0) => Ok(Partition::WholeDevice),
            Ok(n) => Ok(Partition::Number(n)),
            Err(_) => Err(PartitionParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid partition selector.
#[derive(Debug, Clone)]
pub struct PartitionParseError(String);

impl Display for PartitionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid partition '{}': expected a non-negative integer",
            self.0
        )
    }
}

impl std::error::Error for PartitionParseError {}

// ============================================================================
// Mount options
// ============================================================================

/// Append `flags` to `options`, skipping any already present.
///
/// First occurrence wins and order is preserved, so duplicate options are
/// never passed to the mount command.
pub fn merge_mount_flags(options: &mut Vec<String>, flags: &[String]) {
    for flag in flags {
        if !options.contains(flag) {
            options.push(flag.clone());
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wwn_normalization() {
        let wwn: Wwn = "0x5000C500A1B2C3D4".parse().unwrap();
        assert_eq!(wwn.as_str(), "5000c500a1b2c3d4");

        let wwn: Wwn = "600507681081818b3000000000001a2b".parse().unwrap();
        assert_eq!(wwn.to_string(), "600507681081818b3000000000001a2b");
    }

    #[test]
    fn test_wwn_empty_rejected() {
        assert!("".parse::<Wwn>().is_err());
        assert!("0x".parse::<Wwn>().is_err());
        assert!("  ".parse::<Wwn>().is_err());
    }

    #[test]
    fn test_partition_parsing() {
        assert_eq!("0".parse::<Partition>().unwrap(), Partition::WholeDevice);
        assert_eq!("1".parse::<Partition>().unwrap(), Partition::Number(1));
        assert_eq!(" 12 ".parse::<Partition>().unwrap(), Partition::Number(12));
    }

    #[test]
    fn test_partition_invalid() {
        assert!("partition1".parse::<Partition>().is_err());
        assert!("-1".parse::<Partition>().is_err());
        assert!("".parse::<Partition>().is_err());
        let err = "abc".parse::<Partition>().unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn test_partition_device_path() {
        assert_eq!(Partition::WholeDevice.device_path("/dev/sdb"), "/dev/sdb");
        assert_eq!(Partition::Number(1).device_path("/dev/sdb"), "/dev/sdb1");
        assert_eq!(
            Partition::Number(2).device_path("/dev/nvme0n1"),
            "/dev/nvme0n1p2"
        );
        assert_eq!(
            Partition::Number(1).device_path("/dev/mapper/mpatha"),
            "/dev/mapper/mpatha-part1"
        );
    }

    #[test]
    fn test_merge_mount_flags_dedup() {
        let mut options = Vec::new();
        let flags: Vec<String> = ["noexec", "dirsync", "noexec"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        merge_mount_flags(&mut options, &flags);
        assert_eq!(options, vec!["noexec", "dirsync"]);
    }

    #[test]
    fn test_merge_mount_flags_keeps_base_options() {
        let mut options = vec!["bind".to_string(), "ro".to_string()];
        let flags = vec!["ro".to_string(), "noatime".to_string(), "bind".to_string()];
        merge_mount_flags(&mut options, &flags);
        assert_eq!(options, vec!["bind", "ro", "noatime"]);
    }
}

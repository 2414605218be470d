//! IBM Power Virtual Server CSI Node Plugin Library
//!
//! Node half of a Kubernetes CSI driver for Fibre Channel attached block
//! volumes. The controller side attaches a LUN to the instance and hands
//! its WWN to the node; this crate turns that WWN into a mounted filesystem
//! or a raw block device for the workload.
//!
//! This library provides:
//! - CSI Identity and Node service implementations
//! - Fibre Channel device resolution and multipath teardown
//! - Mount table, format and resize primitives
//! - Node metadata and cloud catalog lookups for topology reporting

/// CSI proto generated types
pub mod csi {
    tonic::include_proto!("csi.v1");
}

pub mod cloud;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod node;
pub mod options;
pub mod platform;
pub mod types;

pub use error::DriverError;
pub use identity::IdentityService;
pub use node::NodeService;
pub use options::DriverOptions;

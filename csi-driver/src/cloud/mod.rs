//! Cloud collaborators of the node service
//!
//! - [`Metadata`]: identity of the instance this node runs on, resolved
//!   once at startup from the node labels
//! - [`Cloud`]: instance and image lookups used to report the disk tier
//!   in the node topology

mod catalog;
mod error;
mod metadata;

use serde::{Deserialize, Serialize};

pub use catalog::CatalogCloud;
pub use error::{CloudError, Result};
pub use metadata::Metadata;

/// A virtual server instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub image_id: String,
}

/// A boot image; its disk type is the storage tier of the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub disk_type: String,
}

/// Read-only cloud lookups needed on the node side.
pub trait Cloud: Send + Sync {
    fn get_instance_by_id(&self, instance_id: &str) -> Result<Instance>;

    fn get_image_by_id(&self, image_id: &str) -> Result<Image>;
}

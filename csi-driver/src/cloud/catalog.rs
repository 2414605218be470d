//! Cloud lookups served from a JSON catalog.
//!
//! The catalog is a snapshot of the instances and images of the workspace,
//! refreshed out of band:
//!
//! ```json
//! {
//!   "instances": [{ "id": "pvm-1", "name": "worker-1", "imageId": "img-1" }],
//!   "images": [{ "id": "img-1", "name": "rhcos", "diskType": "tier1" }]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{Cloud, CloudError, Image, Instance, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogCloud {
    #[serde(default)]
    instances: Vec<Instance>,
    #[serde(default)]
    images: Vec<Image>,
}

impl CatalogCloud {
    pub fn new(instances: Vec<Instance>, images: Vec<Image>) -> Self {
        Self { instances, images }
    }

    /// Load the catalog from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog: CatalogCloud = serde_json::from_str(&content)?;
        info!(
            path = %path.display(),
            instances = catalog.instances.len(),
            images = catalog.images.len(),
            "Loaded cloud catalog"
        );
        Ok(catalog)
    }
}

impl Cloud for CatalogCloud {
    fn get_instance_by_id(&self, instance_id: &str) -> Result<Instance> {
        debug!(instance_id = %instance_id, "Looking up instance");
        self.instances
            .iter()
            .find(|i| i.id == instance_id)
            .cloned()
            .ok_or_else(|| CloudError::InstanceNotFound(instance_id.to_string()))
    }

    fn get_image_by_id(&self, image_id: &str) -> Result<Image> {
        debug!(image_id = %image_id, "Looking up image");
        self.images
            .iter()
            .find(|i| i.id == image_id)
            .cloned()
            .ok_or_else(|| CloudError::ImageNotFound(image_id.to_string()))
    }
}

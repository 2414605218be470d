//! Instance metadata for the local node.
//!
//! The node's cloud identity is published as node labels
//! (`serviceInstanceId`, `nodeInstanceId`, `region`) and mounted into the
//! plugin container as a JSON object. Every label is required.

use std::collections::HashMap;
use std::path::Path;

use tracing::info;

use super::{CloudError, Result};

const SERVICE_INSTANCE_ID_LABEL: &str = "serviceInstanceId";
const NODE_INSTANCE_ID_LABEL: &str = "nodeInstanceId";
const REGION_LABEL: &str = "region";

/// Identity of the instance the driver runs on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    service_instance_id: String,
    node_instance_id: String,
    region: String,
}

impl Metadata {
    pub fn new(
        service_instance_id: impl Into<String>,
        node_instance_id: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            service_instance_id: service_instance_id.into(),
            node_instance_id: node_instance_id.into(),
            region: region.into(),
        }
    }

    /// Build metadata from the labels of node `node_name`.
    pub fn from_labels(labels: &HashMap<String, String>, node_name: &str) -> Result<Self> {
        let get = |key: &str| {
            labels
                .get(key)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| CloudError::MissingLabel {
                    label: key.to_string(),
                    node: node_name.to_string(),
                })
        };

        Ok(Self {
            service_instance_id: get(SERVICE_INSTANCE_ID_LABEL)?,
            node_instance_id: get(NODE_INSTANCE_ID_LABEL)?,
            region: get(REGION_LABEL)?,
        })
    }

    /// Load the node labels JSON file.
    pub fn load(path: impl AsRef<Path>, node_name: &str) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), node = %node_name, "Retrieving instance data from node labels");

        let content = std::fs::read_to_string(path)?;
        let labels: HashMap<String, String> = serde_json::from_str(&content)?;
        Self::from_labels(&labels, node_name)
    }

    pub fn service_instance_id(&self) -> &str {
        &self.service_instance_id
    }

    pub fn node_instance_id(&self) -> &str {
        &self.node_instance_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }
}

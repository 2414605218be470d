use thiserror::Error;

use crate::cloud::CloudError;

/// Failures while constructing or starting the driver.
///
/// RPC failures never use this type; they are reported as `tonic::Status`.
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("failed to retrieve node metadata: {0}")]
    Metadata(#[source] CloudError),

    #[error("failed to load cloud catalog: {0}")]
    Cloud(#[source] CloudError),

    #[error("unsupported endpoint '{0}': expected unix://<absolute path>")]
    Endpoint(String),
}

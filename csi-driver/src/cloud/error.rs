use thiserror::Error;

#[derive(Error, Debug)]
pub enum CloudError {
    #[error("instance '{0}' not found")]
    InstanceNotFound(String),

    #[error("image '{0}' not found")]
    ImageNotFound(String),

    #[error("error getting label {label} for node {node}")]
    MissingLabel { label: String, node: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CloudError>;

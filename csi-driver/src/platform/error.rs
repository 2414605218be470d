use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("failed to execute {command}: {source}")]
    CommandExec {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{command} failed: {stderr}")]
    CommandFailed {
        command: String,
        /// Exit status, `None` if the process was killed by a signal
        code: Option<i32>,
        stderr: String,
    },

    #[error("{0} is not mounted")]
    NotMounted(String),

    #[error("no device found for WWN {0}")]
    DeviceNotFound(String),

    #[error("unsupported filesystem type: {0}")]
    UnsupportedFilesystem(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

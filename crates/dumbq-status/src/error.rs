//! Status publication error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for status operations.
pub type StatusResult<T> = Result<T, StatusError>;

/// Errors that can occur while publishing the status document.
///
/// All of these are tick-local: the document simply stays stale until
/// the next successful publish.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("could not enumerate run records: {0}")]
    Records(#[from] dumbq_container::ContainerError),

    #[error("could not serialize status document: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not publish {path}: {source}")]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },
}

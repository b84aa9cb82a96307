//! Container lifecycle error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for container operations.
pub type ContainerResult<T> = Result<T, ContainerError>;

/// Errors that can occur while driving the container runtime.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} timed out")]
    Timeout { command: String },

    #[error("launcher failed for container {container}: {status}")]
    Launch { container: String, status: String },

    #[error("destroy failed for container {container}: {status}")]
    Destroy { container: String, status: String },

    #[error("container listing failed: {status}")]
    List { status: String },

    #[error("run record i/o failed at {path}: {source}")]
    Record {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("run record serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

//! Catalog error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors that can occur while loading the project catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not fetch catalog {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("catalog {path} contains no valid project line")]
    NoValidProjects { path: PathBuf },

    #[error("catalog {path} chances sum to {sum}, expected exactly 100")]
    ChanceSum { path: PathBuf, sum: u32 },
}

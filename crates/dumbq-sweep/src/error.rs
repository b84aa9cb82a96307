//! Sweep error types.

use thiserror::Error;

/// Result type alias for sweep operations.
pub type SweepResult<T> = Result<T, SweepError>;

/// Errors that abort a whole sweep pass.
///
/// Per-container stop failures do not abort a sweep; they are logged and
/// retried on the next pass. Only failing to enumerate either side of
/// the comparison does.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("could not enumerate run records: {0}")]
    Records(#[source] dumbq_container::ContainerError),

    #[error("could not query alive containers: {0}")]
    Runtime(#[source] dumbq_container::ContainerError),
}

//! dumbq-sweep — crash-consistent state reconciliation.
//!
//! The run directory records what the daemon believes is active; the
//! container runtime reports what actually is. This crate closes the
//! gap: any recorded container absent from the runtime's alive set is
//! reclaimed (stopped and cleaned), freeing its slot. Live containers
//! without a record belong to another mechanism and are left alone.
//!
//! The sweep runs at daemon startup — recovering from containers that
//! died while the daemon was down — and on every loop tick where
//! capacity appears full.

pub mod error;
pub mod sweep;

pub use error::{SweepError, SweepResult};
pub use sweep::Sweep;

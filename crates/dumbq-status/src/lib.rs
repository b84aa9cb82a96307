//! dumbq-status — the externally published node snapshot.
//!
//! A web server (out of our hands) serves the public www directory; the
//! daemon drops `index.json` there with the current instances, host
//! identity, uptime, load, and run-hours. The write goes to a temp file
//! in the same directory followed by an atomic rename — that rename is
//! the only synchronization protecting concurrent readers, and the only
//! one needed since this daemon is the sole writer.
//!
//! A stale `updated` timestamp is the externally visible signal of a
//! stuck daemon.

pub mod error;
pub mod platform;
pub mod publisher;

pub use error::{StatusError, StatusResult};
pub use publisher::{Publisher, StatusDocument};

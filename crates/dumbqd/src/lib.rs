//! dumbqd — daemon assembly and the perpetual scheduling loop.
//!
//! The binary in `main.rs` does CLI parsing, logging setup, and the
//! fail-fast startup sequence; everything after that lives in
//! [`Daemon`], which is generic over the container runtime so the loop
//! can be exercised end-to-end against a mock.

pub mod daemon;

pub use daemon::Daemon;

//! dumbq-container — container lifecycle control.
//!
//! The daemon never talks to the container runtime directly; everything
//! goes through an external launcher/destroyer executable. This crate
//! owns that boundary:
//!
//! - [`ContainerRuntime`] — the seam to the external executable, with a
//!   production [`ForkRuntime`] and a scriptable [`mock::MockRuntime`].
//! - [`LaunchInvocation`] — typed builder for the launcher argument
//!   vector (no shell, no quoting).
//! - [`RunDir`]/[`RunRecord`] — the durable on-disk records that assert
//!   which containers this daemon owns.
//! - [`Lifecycle`] — start/stop orchestration tying the above together.
//! - [`Console`] — optional tty reservation and console attendants.

pub mod console;
pub mod error;
pub mod launch;
pub mod lifecycle;
pub mod mock;
pub mod records;
pub mod runtime;

pub use console::Console;
pub use error::{ContainerError, ContainerResult};
pub use launch::LaunchInvocation;
pub use lifecycle::Lifecycle;
pub use records::{RunDir, RunRecord};
pub use runtime::{ContainerRuntime, ForkRuntime};

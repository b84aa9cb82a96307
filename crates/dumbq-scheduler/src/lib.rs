//! dumbq-scheduler — admission control.
//!
//! Two small, pure decisions drive the daemon loop: whether a free slot
//! exists, and which project wins the admission roll. Both are kept free
//! of I/O so they can be tested exhaustively; the caller supplies the
//! slot count (run-record files govern occupancy) and the RNG.

pub mod scheduler;

pub use scheduler::{has_free_slot, pick_project, pick_with_draw};

//! dumbq-catalog — the declarative project catalog.
//!
//! A catalog is a plain-text file, one project per line:
//!
//! ```text
//! # comment
//! alice:60:alice.cern.ch,sft.cern.ch:alice/bootstrap.sh
//! lhcb:40:lhcb.cern.ch:lhcb/run.sh
//! ```
//!
//! Loading is fail-fast: a catalog whose valid chances do not sum to
//! exactly 100 — or that yields no valid project at all — is rejected
//! wholesale. Running with a skewed catalog would silently distort
//! admission ratios, so that failure is fatal to daemon startup.
//!
//! Preference overrides are a second, tolerant file that substitutes
//! individual chances before the admission roll.

pub mod catalog;
pub mod error;
pub mod overrides;
pub mod project;

pub use catalog::Catalog;
pub use error::{CatalogError, CatalogResult};
pub use overrides::PreferenceOverrides;
pub use project::ProjectSpec;

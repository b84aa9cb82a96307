//! Catalog loading and validation.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CatalogError, CatalogResult};
use crate::project::{ProjectSpec, is_ignorable};

/// An ordered, validated set of weighted project records.
///
/// Immutable once loaded. Declaration order matters: weighted selection
/// walks projects in this order.
#[derive(Debug, Clone)]
pub struct Catalog {
    source: PathBuf,
    projects: Vec<ProjectSpec>,
}

impl Catalog {
    /// Load and validate a catalog file.
    ///
    /// Lines that fail the grammar or the traversal guard are dropped with
    /// a warning; the load itself fails only when no valid project remains
    /// or the valid chances do not sum to exactly 100. Those failures are
    /// fatal to daemon startup.
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse catalog content (separated from I/O for testability).
    pub fn parse(path: &Path, content: &str) -> CatalogResult<Self> {
        let mut projects = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if is_ignorable(line) {
                continue;
            }
            match ProjectSpec::parse(line) {
                Some(spec) => projects.push(spec),
                None => {
                    warn!(line = number + 1, "dropping invalid catalog line");
                }
            }
        }

        if projects.is_empty() {
            return Err(CatalogError::NoValidProjects {
                path: path.to_path_buf(),
            });
        }

        let sum: u32 = projects.iter().map(|p| p.chance).sum();
        if sum != 100 {
            return Err(CatalogError::ChanceSum {
                path: path.to_path_buf(),
                sum,
            });
        }

        debug!(projects = projects.len(), path = ?path, "catalog loaded");
        Ok(Self {
            source: path.to_path_buf(),
            projects,
        })
    }

    /// Projects in declaration order.
    pub fn projects(&self) -> &[ProjectSpec] {
        &self.projects
    }

    /// The file this catalog was loaded from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

//! Project line grammar.
//!
//! `name:chance[,extra-fields]:comma-separated-repo-list:bootstrap-path`
//!
//! The chance field may carry extra comma-separated values; only the
//! first is the admission weight. Repo list and bootstrap path must not
//! contain a `..` segment — they address content under a read-only
//! content root and must not escape it.

use std::sync::LazyLock;

use regex::Regex;

static LINE_GRAMMAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^:]+):(\d+(?:,\d+)*):([^:]*):(.+)$").expect("valid grammar"));

static PATH_TRAVERSAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.\.").expect("valid pattern"));

/// One catalog entry: a workload definition that can be instantiated as
/// a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    /// Unique project identifier.
    pub name: String,
    /// Base admission weight, 0–100.
    pub chance: u32,
    /// Content repositories the container mounts.
    pub repositories: Vec<String>,
    /// Execution entry point inside the mounted content.
    pub bootstrap_path: String,
}

impl ProjectSpec {
    /// Parse one catalog line. Returns `None` for lines that do not match
    /// the grammar or that attempt path traversal.
    pub fn parse(line: &str) -> Option<Self> {
        let captures = LINE_GRAMMAR.captures(line)?;
        if PATH_TRAVERSAL.is_match(line) {
            return None;
        }

        // Only the first comma-separated value of the chance field counts.
        let chance_field = captures.get(2)?.as_str();
        let chance: u32 = chance_field.split(',').next()?.parse().ok()?;

        let repositories = captures
            .get(3)?
            .as_str()
            .split(',')
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();

        Some(Self {
            name: captures.get(1)?.as_str().to_string(),
            chance,
            repositories,
            bootstrap_path: captures.get(4)?.as_str().to_string(),
        })
    }

    /// The repo list in the launcher's comma-separated wire form.
    pub fn repository_list(&self) -> String {
        self.repositories.join(",")
    }
}

/// True for comment (`#`) and blank lines, which carry no project.
pub fn is_ignorable(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

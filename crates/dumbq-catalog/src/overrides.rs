//! Preference overrides.
//!
//! An operator-maintained file that substitutes individual project
//! chances before the admission roll: `name-or-*:chance`, one per line,
//! `#`-comments allowed. Overrides need not sum to anything; they only
//! replace weights. A missing file is an empty override set.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::project::is_ignorable;

/// Wildcard key applying to every project.
const WILDCARD: &str = "*";

/// Chance overrides keyed by project name or `*`.
#[derive(Debug, Clone, Default)]
pub struct PreferenceOverrides {
    chances: HashMap<String, u32>,
}

impl PreferenceOverrides {
    /// Load overrides from a file. Tolerant: a missing or empty file is an
    /// empty set, malformed lines are dropped with a warning.
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => {
                info!(path = ?path, "overriding project preferences");
                content
            }
            Err(_) => {
                debug!(path = ?path, "no preference file, using catalog chances");
                return Self::default();
            }
        };
        Self::parse(&content)
    }

    /// Parse override content.
    pub fn parse(content: &str) -> Self {
        let mut chances = HashMap::new();
        for (number, line) in content.lines().enumerate() {
            if is_ignorable(line) {
                continue;
            }
            let parsed = line.split_once(':').and_then(|(name, chance_field)| {
                // Same convention as the catalog: first comma-field wins.
                let chance: u32 = chance_field.split(',').next()?.trim().parse().ok()?;
                let name = name.trim();
                (!name.is_empty()).then(|| (name.to_string(), chance))
            });
            match parsed {
                Some((name, chance)) => {
                    chances.insert(name, chance);
                }
                None => warn!(line = number + 1, "dropping invalid preference line"),
            }
        }
        Self { chances }
    }

    /// Build from explicit pairs (used by tests and tools).
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        Self {
            chances: pairs.into_iter().map(|(n, c)| (n.into(), c)).collect(),
        }
    }

    /// The override that applies to `name`, if any.
    ///
    /// When both a wildcard and a project-specific override exist the
    /// numerically larger wins — the wildcard is an operator boost, so a
    /// project can only gain from it, never lose.
    pub fn override_for(&self, name: &str) -> Option<u32> {
        let wildcard = self.chances.get(WILDCARD).copied();
        let specific = self.chances.get(name).copied();
        match (wildcard, specific) {
            (Some(w), Some(s)) => Some(w.max(s)),
            (one, other) => one.or(other),
        }
    }

    /// The effective chance for `name` given its catalog base weight.
    pub fn effective_chance(&self, name: &str, base: u32) -> u32 {
        self.override_for(name).unwrap_or(base)
    }

    pub fn is_empty(&self) -> bool {
        self.chances.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty() {
        let overrides = PreferenceOverrides::load(Path::new("/nonexistent/preference.conf"));
        assert!(overrides.is_empty());
        assert_eq!(overrides.effective_chance("alice", 60), 60);
    }

    #[test]
    fn parses_names_and_wildcard() {
        let overrides = PreferenceOverrides::parse("# boost alice\nalice:80\n*:10\n");
        assert_eq!(overrides.override_for("alice"), Some(80));
        assert_eq!(overrides.override_for("lhcb"), Some(10));
    }

    #[test]
    fn larger_of_wildcard_and_specific_wins() {
        let overrides = PreferenceOverrides::from_pairs([("*", 50), ("alice", 20)]);
        assert_eq!(overrides.effective_chance("alice", 60), 50);

        let overrides = PreferenceOverrides::from_pairs([("*", 20), ("alice", 50)]);
        assert_eq!(overrides.effective_chance("alice", 60), 50);
    }

    #[test]
    fn single_override_wins_alone() {
        let overrides = PreferenceOverrides::from_pairs([("alice", 5u32)]);
        assert_eq!(overrides.effective_chance("alice", 60), 5);

        let overrides = PreferenceOverrides::from_pairs([("*", 5u32)]);
        assert_eq!(overrides.effective_chance("alice", 60), 5);
    }

    #[test]
    fn no_override_returns_base() {
        let overrides = PreferenceOverrides::from_pairs([("lhcb", 5u32)]);
        assert_eq!(overrides.effective_chance("alice", 60), 60);
    }

    #[test]
    fn malformed_lines_are_dropped() {
        let overrides = PreferenceOverrides::parse("alice\n:30\nalice:abc\nlhcb:25\n");
        assert_eq!(overrides.override_for("alice"), None);
        assert_eq!(overrides.override_for("lhcb"), Some(25));
    }

    #[test]
    fn chance_extra_fields_are_ignored() {
        let overrides = PreferenceOverrides::parse("alice:80,20\n");
        assert_eq!(overrides.override_for("alice"), Some(80));
    }
}

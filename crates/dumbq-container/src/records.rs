//! Run records, the daemon's durable ownership ledger.
//!
//! One JSON file per active container, named by the container, inside
//! the run directory. The file's existence is the authoritative "this
//! container is active and owns its resources" assertion: slot
//! accounting counts these files, reconciliation compares them against
//! the runtime's alive set, and the status document republishes their
//! raw content.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ContainerError, ContainerResult};

/// Resources and identity of one active container.
///
/// The wire form is exactly `{uuid, wwwroot, project, memory, swap,
/// cpus}`; the container name lives in the filename, not the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Container name — the record's filename, never serialized.
    #[serde(skip)]
    pub container: String,
    /// Per-launch UUID.
    pub uuid: String,
    /// Public path fragment of the instance's www directory.
    pub wwwroot: String,
    /// The catalog project this container runs.
    pub project: String,
    /// Memory quota in KB.
    pub memory: u64,
    /// Memory+swap quota in KB.
    pub swap: u64,
    /// CPU slots held.
    pub cpus: u32,
}

/// The run directory: a filesystem-backed store of [`RunRecord`]s.
#[derive(Debug, Clone)]
pub struct RunDir {
    root: PathBuf,
}

impl RunDir {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the directory if it does not exist yet.
    pub fn ensure(&self) -> ContainerResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|source| ContainerError::Io {
            path: self.root.clone(),
            source,
        })
    }

    fn path_of(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    /// Persist a record. Callers only do this after a successful launch;
    /// a failed write must abort the admission attempt.
    pub fn write(&self, record: &RunRecord) -> ContainerResult<()> {
        let path = self.path_of(&record.container);
        let body = serde_json::to_string(record)?;
        std::fs::write(&path, body).map_err(|source| ContainerError::Record { path, source })
    }

    /// Read a record back, restoring the container name from the
    /// filename. `None` when the record does not exist.
    pub fn read(&self, container: &str) -> ContainerResult<Option<RunRecord>> {
        match self.read_raw(container)? {
            Some(body) => {
                let mut record: RunRecord = serde_json::from_str(&body)?;
                record.container = container.to_string();
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Raw record body, as republished in the status document.
    pub fn read_raw(&self, container: &str) -> ContainerResult<Option<String>> {
        let path = self.path_of(container);
        match std::fs::read_to_string(&path) {
            Ok(body) => Ok(Some(body.lines().next().unwrap_or_default().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ContainerError::Record { path, source }),
        }
    }

    /// Remove a record. `Ok(false)` when it was already gone.
    pub fn remove(&self, container: &str) -> ContainerResult<bool> {
        let path = self.path_of(container);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(ContainerError::Record { path, source }),
        }
    }

    /// Container names of every record on disk, in stable order.
    pub fn list(&self) -> ContainerResult<BTreeSet<String>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(source) => {
                return Err(ContainerError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let mut names = BTreeSet::new();
        for entry in entries {
            let entry = entry.map_err(|source| ContainerError::Io {
                path: self.root.clone(),
                source,
            })?;
            if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                names.insert(entry.file_name().to_string_lossy().into_owned());
            }
        }
        Ok(names)
    }

    /// Number of records — the daemon's active-slot count.
    pub fn count(&self) -> ContainerResult<usize> {
        Ok(self.list()?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(container: &str) -> RunRecord {
        RunRecord {
            container: container.to_string(),
            uuid: "u-1".to_string(),
            wwwroot: format!("/inst-{container}"),
            project: "alice".to_string(),
            memory: 2048,
            swap: 4096,
            cpus: 1,
        }
    }

    fn run_dir() -> (tempfile::TempDir, RunDir) {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDir::new(dir.path().join("run"));
        run_dir.ensure().unwrap();
        (dir, run_dir)
    }

    #[test]
    fn wire_form_has_exact_fields() {
        let body = serde_json::to_value(record("alice-1")).unwrap();
        let object = body.as_object().unwrap();
        // Container name lives in the filename, not the body.
        assert_eq!(object.len(), 6);
        for key in ["uuid", "wwwroot", "project", "memory", "swap", "cpus"] {
            assert!(object.contains_key(key), "missing field {key}");
        }
    }

    #[test]
    fn write_read_round_trip_restores_container_name() {
        let (_guard, run_dir) = run_dir();
        run_dir.write(&record("alice-1")).unwrap();

        let loaded = run_dir.read("alice-1").unwrap().unwrap();
        assert_eq!(loaded, record("alice-1"));
    }

    #[test]
    fn write_creates_exactly_one_record() {
        let (_guard, run_dir) = run_dir();
        run_dir.write(&record("alice-1")).unwrap();
        assert_eq!(run_dir.count().unwrap(), 1);

        // Rewriting the same container does not grow the set.
        run_dir.write(&record("alice-1")).unwrap();
        assert_eq!(run_dir.count().unwrap(), 1);
    }

    #[test]
    fn remove_frees_the_slot() {
        let (_guard, run_dir) = run_dir();
        run_dir.write(&record("alice-1")).unwrap();

        assert!(run_dir.remove("alice-1").unwrap());
        assert_eq!(run_dir.count().unwrap(), 0);
        assert!(run_dir.read("alice-1").unwrap().is_none());

        // Absence is not an error.
        assert!(!run_dir.remove("alice-1").unwrap());
    }

    #[test]
    fn list_is_sorted_and_complete() {
        let (_guard, run_dir) = run_dir();
        run_dir.write(&record("b-2")).unwrap();
        run_dir.write(&record("a-1")).unwrap();

        let names: Vec<_> = run_dir.list().unwrap().into_iter().collect();
        assert_eq!(names, vec!["a-1", "b-2"]);
    }

    #[test]
    fn missing_run_dir_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let run_dir = RunDir::new(dir.path().join("never-created"));
        assert!(run_dir.list().unwrap().is_empty());
        assert_eq!(run_dir.count().unwrap(), 0);
    }

    #[test]
    fn read_raw_returns_first_line() {
        let (_guard, run_dir) = run_dir();
        run_dir.write(&record("alice-1")).unwrap();

        let raw = run_dir.read_raw("alice-1").unwrap().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["project"], "alice");
        assert!(run_dir.read_raw("ghost").unwrap().is_none());
    }
}

//! Status document assembly and atomic swap.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use dumbq_container::RunDir;

use crate::error::{StatusError, StatusResult};
use crate::platform;

const INDEX_FILE: &str = "index.json";
const TEMP_FILE: &str = "index.new";

/// The published JSON snapshot.
///
/// `instances` carries each run record's raw on-disk body — the daemon
/// republishes what it wrote, byte for byte, so external monitors see
/// exactly the authoritative records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusDocument {
    pub instances: Vec<String>,
    /// Unix seconds of this publication. Staleness here is the external
    /// "daemon is stuck" signal.
    pub updated: u64,
    pub machine_uuid: String,
    pub version: String,
    pub uptime: Option<String>,
    pub load: Option<String>,
    pub runhours: u64,
}

/// Serializes node/slot/project state and swaps it into the public path.
pub struct Publisher {
    run_dir: RunDir,
    www_dir: PathBuf,
    runhours_path: PathBuf,
    machine_uuid: String,
    version: String,
}

impl Publisher {
    pub fn new(
        run_dir: RunDir,
        www_dir: PathBuf,
        runhours_path: PathBuf,
        machine_uuid: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            run_dir,
            www_dir,
            runhours_path,
            machine_uuid: machine_uuid.into(),
            version: version.into(),
        }
    }

    /// Assemble the current snapshot.
    pub fn assemble(&self) -> StatusResult<StatusDocument> {
        let mut instances = Vec::new();
        for container in self.run_dir.list()? {
            // Records can vanish between list and read when a stop races
            // this publish; skip them rather than publish an empty entry.
            match self.run_dir.read_raw(&container) {
                Ok(Some(raw)) => instances.push(raw),
                Ok(None) => debug!(container = %container, "run record vanished during publish"),
                Err(e) => warn!(container = %container, error = %e, "unreadable run record skipped"),
            }
        }

        Ok(StatusDocument {
            instances,
            updated: epoch_secs(),
            machine_uuid: self.machine_uuid.clone(),
            version: self.version.clone(),
            uptime: platform::uptime(),
            load: platform::load_average(),
            runhours: platform::run_hours(&self.runhours_path),
        })
    }

    /// Publish the snapshot: write the temp file, then atomically rename
    /// it over the public path. Readers either see the old document or
    /// the new one, never a partial write.
    pub fn publish(&self) -> StatusResult<()> {
        let document = self.assemble()?;
        let body = serde_json::to_string(&document)?;

        let temp_path = self.www_dir.join(TEMP_FILE);
        let index_path = self.www_dir.join(INDEX_FILE);

        std::fs::write(&temp_path, body).map_err(|source| StatusError::Write {
            path: temp_path.clone(),
            source,
        })?;
        std::fs::rename(&temp_path, &index_path).map_err(|source| StatusError::Rename {
            path: index_path.clone(),
            source,
        })?;

        debug!(instances = document.instances.len(), path = ?index_path, "status published");
        Ok(())
    }

    /// The public path this publisher swaps into.
    pub fn index_path(&self) -> PathBuf {
        self.www_dir.join(INDEX_FILE)
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

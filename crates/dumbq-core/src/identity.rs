//! Host identity resolution.
//!
//! The host UUID stamps every launched container (`DUMBQ_VMID`) and the
//! published status document. Resolution order:
//!
//! 1. the `CERNVM_UUID` key of the host config file,
//! 2. the persisted uuid file,
//! 3. a freshly generated v4 UUID, persisted for next time.
//!
//! Missing files along the chain are normal, not errors. Only the final
//! persist step can fail, and that is a warning — the generated identity
//! is still used for this run.

use std::path::Path;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;

const HOST_UUID_KEY: &str = "CERNVM_UUID";

/// Resolve the stable host UUID. Never fails; worst case the identity is
/// ephemeral for this run.
pub fn host_uuid(config: &Config) -> String {
    if let Some(uuid) = uuid_from_host_config(&config.host_config_path) {
        debug!(path = ?config.host_config_path, "host uuid from host config");
        return uuid;
    }
    if let Some(uuid) = uuid_from_file(&config.uuid_path) {
        debug!(path = ?config.uuid_path, "host uuid from uuid file");
        return uuid;
    }

    let uuid = Uuid::new_v4().to_string();
    if let Err(e) = std::fs::write(&config.uuid_path, &uuid) {
        warn!(path = ?config.uuid_path, error = %e, "could not persist generated host uuid");
    } else {
        debug!(path = ?config.uuid_path, "generated and persisted new host uuid");
    }
    uuid
}

/// Scan a `KEY=VALUE` host config file for the UUID key.
fn uuid_from_host_config(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        if key.trim() == HOST_UUID_KEY {
            let value = value.trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

fn uuid_from_file(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let uuid = content.trim();
    if uuid.is_empty() {
        None
    } else {
        Some(uuid.to_string())
    }
}

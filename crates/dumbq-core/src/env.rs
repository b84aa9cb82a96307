//! Environment-injection sources.
//!
//! Containers receive operator-provided `KEY=VALUE` pairs from two
//! optional sources: a removable-media reader executable (stdout parsed)
//! and a local file. Both are read once at startup, media first.
//! Duplicate keys accumulate as separate entries; callers that need
//! unique keys dedupe themselves.

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::Config;

/// One `KEY=VALUE` pair destined for a container environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvInjection {
    pub key: String,
    pub value: String,
}

/// Read all env injections configured for this node. Absent sources are
/// skipped silently; a failing media reader is a warning, not an error.
pub async fn read_env_injections(config: &Config) -> Vec<EnvInjection> {
    let mut injections = Vec::new();

    if config.media_reader_bin.exists() {
        match read_from_media(config).await {
            Ok(vars) => injections.extend(vars),
            Err(e) => {
                warn!(bin = ?config.media_reader_bin, error = %e, "media env reader failed");
            }
        }
    }

    if let Ok(content) = std::fs::read_to_string(&config.env_file) {
        injections.extend(parse_env_lines(&content));
    }

    debug!(count = injections.len(), "environment injections loaded");
    injections
}

async fn read_from_media(config: &Config) -> std::io::Result<Vec<EnvInjection>> {
    let output = tokio::time::timeout(
        config.command_timeout,
        Command::new(&config.media_reader_bin)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "media reader timed out"))??;

    if !output.status.success() {
        return Err(std::io::Error::other(format!(
            "media reader exited with {}",
            output.status
        )));
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_env_lines(&stdout))
}

/// Parse `KEY=VALUE` lines, skipping anything without a key.
fn parse_env_lines(content: &str) -> Vec<EnvInjection> {
    content
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some(EnvInjection {
                key: key.to_string(),
                value: value.trim().to_string(),
            })
        })
        .collect()
}

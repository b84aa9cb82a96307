//! Platform stat readers.
//!
//! All readers degrade gracefully: a missing or unreadable source yields
//! `None` (or zero for the run-hours counter) rather than failing the
//! publish.

use std::path::Path;

use tracing::debug;

/// Host uptime as "<up>,<idle>" seconds, from `/proc/uptime`.
pub fn uptime() -> Option<String> {
    uptime_from(Path::new("/proc/uptime"))
}

pub(crate) fn uptime_from(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() < 2 {
        return None;
    }
    Some(format!("{},{}", fields[0], fields[1]))
}

/// Load average as "<1m>, <5m>, <15m>", from `/proc/loadavg`.
pub fn load_average() -> Option<String> {
    load_average_from(Path::new("/proc/loadavg"))
}

pub(crate) fn load_average_from(path: &Path) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let fields: Vec<&str> = content.split_whitespace().take(3).collect();
    if fields.len() < 3 {
        return None;
    }
    Some(fields.join(", "))
}

/// Cumulative run-hours counter. The file is maintained externally;
/// absence means no hours accumulated yet.
pub fn run_hours(path: &Path) -> u64 {
    let Ok(content) = std::fs::read_to_string(path) else {
        debug!(path = ?path, "no run-hours counter yet");
        return 0;
    };
    content
        .lines()
        .next()
        .and_then(|line| line.trim().parse().ok())
        .unwrap_or(0)
}

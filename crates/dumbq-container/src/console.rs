//! Optional container console attachment.
//!
//! Each container may get one real terminal from a reserved tty range.
//! A reservation is a file `tty<N>` holding `"<pid> <container>"`; a
//! reservation whose owning pid is dead is reclaimable. When every tty
//! is taken the container simply runs headless — attachment is a
//! convenience, not a correctness requirement.
//!
//! A successful reservation spawns an attendant task that re-attaches
//! the console until the container leaves the active set, then releases
//! the reservation.

use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::runtime::ContainerRuntime;

/// Delay between attach attempts / liveness checks.
const ATTEND_INTERVAL: Duration = Duration::from_secs(2);

/// Console manager for the daemon's reserved tty range.
pub struct Console<R> {
    runtime: Arc<R>,
    tty_dir: PathBuf,
    range: RangeInclusive<u32>,
}

impl<R: ContainerRuntime> Console<R> {
    pub fn new(runtime: Arc<R>, tty_dir: PathBuf, range: RangeInclusive<u32>) -> Self {
        Self {
            runtime,
            tty_dir,
            range,
        }
    }

    /// Reserve a tty for the container and spawn its attendant.
    ///
    /// Returns the reserved tty, or `None` when the range is exhausted
    /// (logged as an error; the container stays headless).
    pub fn open(&self, container: &str) -> Option<(u32, JoinHandle<()>)> {
        let tty = match self.reserve(container) {
            Some(tty) => tty,
            None => {
                error!(container = %container, "no free tty for container");
                return None;
            }
        };

        info!(tty, container = %container, "reserving tty for container");
        let runtime = self.runtime.clone();
        let tty_dir = self.tty_dir.clone();
        let container = container.to_string();
        let handle = tokio::spawn(async move {
            attend(runtime, tty_dir, tty, container).await;
        });
        Some((tty, handle))
    }

    /// Find the lowest free tty in the range, reclaiming reservations
    /// whose owner died.
    fn reserve(&self, container: &str) -> Option<u32> {
        for tty in self.range.clone() {
            let path = reservation_path(&self.tty_dir, tty);
            if path.exists() && !reclaim_if_dead(&path) {
                continue;
            }
            let body = format!("{} {container}", std::process::id());
            match std::fs::write(&path, body) {
                Ok(()) => return Some(tty),
                Err(e) => {
                    warn!(tty, error = %e, "could not write tty reservation");
                    continue;
                }
            }
        }
        None
    }
}

/// The per-container console loop: announce, attach, and re-check the
/// container until it disappears from the active set.
async fn attend<R: ContainerRuntime>(
    runtime: Arc<R>,
    tty_dir: PathBuf,
    tty: u32,
    container: String,
) {
    loop {
        announce(tty, &container);
        if let Err(e) = runtime.attach(&container, tty).await {
            debug!(tty, container = %container, error = %e, "console attach ended");
        }
        tokio::time::sleep(ATTEND_INTERVAL).await;

        match runtime.list_active().await {
            Ok(active) if active.contains(&container) => continue,
            Ok(_) => break,
            Err(e) => {
                warn!(container = %container, error = %e, "could not query active containers, releasing console");
                break;
            }
        }
    }

    release(&tty_dir, tty);
    debug!(tty, container = %container, "console attendant finished");
}

/// Print a connect banner on the physical terminal. Failure to write to
/// the device is ignored — the attach itself is what matters.
fn announce(tty: u32, container: &str) {
    if let Ok(mut device) = std::fs::OpenOptions::new()
        .write(true)
        .open(format!("/dev/tty{tty}"))
    {
        let _ = writeln!(device, "Connecting to '{container}'...");
    }
}

fn reservation_path(tty_dir: &Path, tty: u32) -> PathBuf {
    tty_dir.join(format!("tty{tty}"))
}

/// Remove a reservation whose owning process is gone. Returns true when
/// the tty is free for reuse.
fn reclaim_if_dead(path: &Path) -> bool {
    let Some(pid) = read_owner_pid(path) else {
        // Unreadable or malformed reservation: treat as dead.
        return remove_reservation(path);
    };
    if pid_alive(pid) {
        return false;
    }
    remove_reservation(path)
}

fn read_owner_pid(path: &Path) -> Option<i32> {
    let content = std::fs::read_to_string(path).ok()?;
    content.split_whitespace().next()?.parse().ok()
}

fn remove_reservation(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) => {
            warn!(path = ?path, error = %e, "could not remove tty reservation");
            false
        }
    }
}

fn release(tty_dir: &Path, tty: u32) {
    let path = reservation_path(tty_dir, tty);
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = ?path, error = %e, "could not release tty reservation");
        }
    }
}

/// Signal 0 probes existence without touching the process.
fn pid_alive(pid: i32) -> bool {
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

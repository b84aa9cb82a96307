//! The admission-and-reconciliation loop.
//!
//! Two states, no terminal state:
//!
//! - **admit**: a free slot exists — roll the dice, start the winner,
//!   publish, short idle.
//! - **idle**: capacity is full — sweep for silently-dead containers,
//!   republish (fresh uptime/load), longer idle.
//!
//! Every iteration is independent; nothing carries over between ticks
//! beyond what is durably recorded in the run directory and the catalog
//! loaded at startup. A failed admission is simply retried with a fresh
//! draw on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use dumbq_catalog::{Catalog, PreferenceOverrides};
use dumbq_container::{Console, ContainerRuntime, Lifecycle};
use dumbq_scheduler::{has_free_slot, pick_project};
use dumbq_status::Publisher;
use dumbq_sweep::Sweep;

/// Idle after an admission attempt.
const ADMIT_IDLE: Duration = Duration::from_secs(1);
/// Idle when capacity is full.
const FULL_IDLE: Duration = Duration::from_secs(10);

/// The assembled daemon.
pub struct Daemon<R> {
    catalog: Catalog,
    overrides: PreferenceOverrides,
    slots: u32,
    lifecycle: Arc<Lifecycle<R>>,
    sweep: Sweep<R>,
    console: Option<Console<R>>,
    publisher: Option<Publisher>,
}

impl<R: ContainerRuntime> Daemon<R> {
    pub fn new(
        catalog: Catalog,
        overrides: PreferenceOverrides,
        slots: u32,
        lifecycle: Arc<Lifecycle<R>>,
        console: Option<Console<R>>,
        publisher: Option<Publisher>,
    ) -> Self {
        Self {
            catalog,
            overrides,
            slots,
            sweep: Sweep::new(lifecycle.clone()),
            lifecycle,
            console,
            publisher,
        }
    }

    /// Startup reconciliation: reclaim whatever died while the daemon
    /// was down, then publish a first status document.
    pub async fn startup(&self) {
        match self.sweep.run().await {
            Ok(reclaimed) if reclaimed > 0 => {
                info!(reclaimed, "startup sweep recovered stale state");
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "startup sweep failed"),
        }
        self.publish();
    }

    /// Run forever. Only process death ends the loop.
    pub async fn run(&self) {
        self.startup().await;
        loop {
            let idle = self.tick().await;
            tokio::time::sleep(idle).await;
        }
    }

    /// One loop iteration. Returns how long to idle before the next.
    pub async fn tick(&self) -> Duration {
        let active = match self.lifecycle.run_dir().count() {
            Ok(active) => active,
            Err(e) => {
                error!(error = %e, "could not count run records");
                return FULL_IDLE;
            }
        };

        if has_free_slot(active, self.slots) {
            info!(active, slots = self.slots, "there is a free slot available");
            self.admit().await;
            self.publish();
            return ADMIT_IDLE;
        }

        // Capacity looks full; check for silently-dead containers.
        match self.sweep.run().await {
            Ok(reclaimed) if reclaimed > 0 => {
                // A slot just freed, come back quickly to refill it.
                self.publish();
                ADMIT_IDLE
            }
            Ok(_) => {
                self.publish();
                FULL_IDLE
            }
            Err(e) => {
                warn!(error = %e, "sweep failed, retrying next tick");
                self.publish();
                FULL_IDLE
            }
        }
    }

    /// Pick a project and try to start it. Failures are tick-local.
    async fn admit(&self) {
        let project = {
            let mut rng = rand::rng();
            pick_project(&self.catalog, &self.overrides, &mut rng)
        };
        let Some(project) = project else {
            // Catalog validation guarantees at least one project.
            error!("admission roll returned no project");
            return;
        };

        match self.lifecycle.start(project).await {
            Ok(record) => {
                if let Some(console) = &self.console {
                    // Attachment is a convenience; exhaustion is already
                    // logged inside and never fails the admission.
                    let _ = console.open(&record.container);
                }
            }
            Err(e) => {
                error!(project = %project.name, error = %e, "could not start project");
            }
        }
    }

    fn publish(&self) {
        if let Some(publisher) = &self.publisher {
            if let Err(e) = publisher.publish() {
                warn!(error = %e, "the status index could not be updated");
            }
        }
    }
}

//! The reconciliation sweep.

use std::sync::Arc;

use tracing::{debug, info, warn};

use dumbq_container::{ContainerRuntime, Lifecycle};

use crate::error::{SweepError, SweepResult};

/// Compares recorded containers against the runtime's alive set and
/// reclaims the dead ones.
pub struct Sweep<R> {
    lifecycle: Arc<Lifecycle<R>>,
}

impl<R: ContainerRuntime> Sweep<R> {
    pub fn new(lifecycle: Arc<Lifecycle<R>>) -> Self {
        Self { lifecycle }
    }

    /// Run one sweep pass. Returns the number of containers reclaimed.
    ///
    /// A record with no matching alive container is the only reclaim
    /// trigger; hung-but-alive containers are not our problem here.
    pub async fn run(&self) -> SweepResult<usize> {
        let recorded = self
            .lifecycle
            .run_dir()
            .list()
            .map_err(SweepError::Records)?;
        let alive = self
            .lifecycle
            .runtime()
            .list_active()
            .await
            .map_err(SweepError::Runtime)?;

        let mut reclaimed = 0;
        for container in recorded {
            if alive.contains(&container) {
                continue;
            }
            info!(container = %container, "cleaning up stale container");
            match self.lifecycle.stop(&container).await {
                Ok(()) => reclaimed += 1,
                Err(e) => {
                    // Leave the record; the next sweep retries.
                    warn!(container = %container, error = %e, "could not reclaim stale container");
                }
            }
        }

        if reclaimed > 0 {
            info!(reclaimed, "sweep reclaimed stale containers");
        } else {
            debug!("sweep found nothing to reclaim");
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use dumbq_catalog::ProjectSpec;
    use dumbq_container::mock::MockRuntime;
    use dumbq_core::{Config, HardwareProfile};

    fn project(name: &str) -> ProjectSpec {
        ProjectSpec {
            name: name.to_string(),
            chance: 100,
            repositories: vec!["repo.cern.ch".to_string()],
            bootstrap_path: "boot.sh".to_string(),
        }
    }

    struct Fixture {
        _guard: tempfile::TempDir,
        lifecycle: Arc<Lifecycle<MockRuntime>>,
        runtime: Arc<MockRuntime>,
        sweep: Sweep<MockRuntime>,
    }

    fn fixture() -> Fixture {
        let guard = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: guard.path().join("dumbq"),
            www_dir: None,
            ..Config::default()
        };
        let runtime = Arc::new(MockRuntime::new());
        let profile = HardwareProfile::from_parts(2, 8000, 4000, "host-uuid", 0);
        let lifecycle = Arc::new(Lifecycle::new(
            runtime.clone(),
            Arc::new(config),
            &profile,
            Vec::new(),
        ));
        lifecycle.run_dir().ensure().unwrap();
        Fixture {
            _guard: guard,
            sweep: Sweep::new(lifecycle.clone()),
            lifecycle,
            runtime,
        }
    }

    #[tokio::test]
    async fn nothing_recorded_reclaims_nothing() {
        let f = fixture();
        assert_eq!(f.sweep.run().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn live_containers_are_left_alone() {
        let f = fixture();
        let record = f.lifecycle.start(&project("alice")).await.unwrap();

        assert_eq!(f.sweep.run().await.unwrap(), 0);
        assert!(f.lifecycle.run_dir().read(&record.container).unwrap().is_some());
        assert!(f.runtime.alive().contains(&record.container));
    }

    #[tokio::test]
    async fn dead_recorded_container_is_reclaimed() {
        let f = fixture();
        let record = f.lifecycle.start(&project("alice")).await.unwrap();

        f.runtime.kill(&record.container);
        assert_eq!(f.sweep.run().await.unwrap(), 1);

        assert!(f.lifecycle.run_dir().read(&record.container).unwrap().is_none());
        assert_eq!(f.lifecycle.run_dir().count().unwrap(), 0);
        assert_eq!(f.runtime.destroys(), vec![record.container]);
    }

    #[tokio::test]
    async fn sweep_reclaims_only_the_dead() {
        let f = fixture();
        let dead = f.lifecycle.start(&project("alice")).await.unwrap();
        let live = f.lifecycle.start(&project("lhcb")).await.unwrap();

        f.runtime.kill(&dead.container);
        assert_eq!(f.sweep.run().await.unwrap(), 1);

        assert!(f.lifecycle.run_dir().read(&dead.container).unwrap().is_none());
        assert!(f.lifecycle.run_dir().read(&live.container).unwrap().is_some());
    }

    #[tokio::test]
    async fn unrecorded_live_container_is_not_touched() {
        let f = fixture();
        // A container someone else launched: alive but not in our run dir.
        f.runtime
            .launch(&dumbq_container::LaunchInvocation::new(
                "foreign-1",
                "/cvmfs/boot.sh",
            ))
            .await
            .unwrap();

        assert_eq!(f.sweep.run().await.unwrap(), 0);
        assert!(f.runtime.alive().contains("foreign-1"));
    }

    #[tokio::test]
    async fn failed_stop_keeps_record_for_next_pass() {
        let f = fixture();
        let record = f.lifecycle.start(&project("alice")).await.unwrap();
        f.runtime.kill(&record.container);
        f.runtime.set_fail_destroy(true);

        // Stop fails; nothing reclaimed, record still present.
        assert_eq!(f.sweep.run().await.unwrap(), 0);
        assert_eq!(f.lifecycle.run_dir().count().unwrap(), 1);

        // Next pass succeeds once the runtime recovers.
        f.runtime.set_fail_destroy(false);
        assert_eq!(f.sweep.run().await.unwrap(), 1);
        assert_eq!(f.lifecycle.run_dir().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn runtime_query_failure_aborts_the_pass() {
        let f = fixture();
        f.lifecycle.start(&project("alice")).await.unwrap();
        f.runtime.set_fail_list(true);

        assert!(matches!(f.sweep.run().await, Err(SweepError::Runtime(_))));
        // Nothing was reclaimed on a failed pass.
        assert_eq!(f.lifecycle.run_dir().count().unwrap(), 1);
    }
}

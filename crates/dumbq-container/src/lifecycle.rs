//! Start/stop orchestration.
//!
//! Admission ordering matters here: the run record is written only after
//! the launcher reports success and the shared metadata copy has landed,
//! so a record on disk always refers to a container that fully started.
//! The reverse holds for teardown — the record is removed only after a
//! successful destroy, so a failed destroy leaves the record for a later
//! sweep to retry.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use dumbq_catalog::ProjectSpec;
use dumbq_core::{Config, EnvInjection, HardwareProfile, SlotQuota};

use crate::error::{ContainerError, ContainerResult};
use crate::launch::LaunchInvocation;
use crate::records::{RunDir, RunRecord};
use crate::runtime::ContainerRuntime;

/// Container lifecycle control for one daemon instance.
pub struct Lifecycle<R> {
    runtime: Arc<R>,
    run_dir: RunDir,
    config: Arc<Config>,
    quota: SlotQuota,
    host_uuid: String,
    env: Vec<EnvInjection>,
}

impl<R: ContainerRuntime> Lifecycle<R> {
    pub fn new(
        runtime: Arc<R>,
        config: Arc<Config>,
        profile: &HardwareProfile,
        env: Vec<EnvInjection>,
    ) -> Self {
        Self {
            runtime,
            run_dir: RunDir::new(config.run_dir()),
            quota: profile.slot_quota(),
            host_uuid: profile.host_uuid.clone(),
            config,
            env,
        }
    }

    pub fn run_dir(&self) -> &RunDir {
        &self.run_dir
    }

    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    pub fn quota(&self) -> SlotQuota {
        self.quota
    }

    /// Start a container for the chosen project.
    ///
    /// On success the returned [`RunRecord`] is already durable. On any
    /// failure the attempt is abandoned outright — no partial record is
    /// ever persisted, and a container that came up is torn back down.
    pub async fn start(&self, project: &ProjectSpec) -> ContainerResult<RunRecord> {
        let container_uuid = Uuid::new_v4().to_string();
        let container = format!("{}-{}", project.name, container_uuid);

        let instance_www = self.config.instance_www_dir(&container);
        if let Some(dir) = &instance_www {
            create_public_dir(dir)?;
        }

        let invocation = self.build_invocation(project, &container, &container_uuid, &instance_www);
        info!(container = %container, project = %project.name, "starting project");
        self.runtime.launch(&invocation).await?;

        if let Some(meta) = &self.config.shared_meta {
            let guest_path = self.config.guest_path(&container, &meta.guest);
            if let Err(e) = copy_metadata(&meta.host, &guest_path) {
                warn!(container = %container, error = %e, "metadata copy failed, abandoning container");
                self.abandon(&container).await;
                return Err(e);
            }
        }

        let record = RunRecord {
            container: container.clone(),
            uuid: container_uuid,
            wwwroot: format!("/inst-{container}"),
            project: project.name.clone(),
            memory: self.quota.mem_per_slot_kb,
            swap: self.quota.swap_per_slot_kb,
            cpus: self.quota.cpu_per_slot,
        };
        if let Err(e) = self.run_dir.write(&record) {
            warn!(container = %container, error = %e, "run record write failed, abandoning container");
            self.abandon(&container).await;
            return Err(e);
        }

        info!(container = %container, project = %project.name, "project started");
        Ok(record)
    }

    /// Stop a container and release everything it held.
    ///
    /// Destroy failure leaves the run record intact so a later sweep
    /// retries; www cleanup is best-effort and never blocks progress.
    pub async fn stop(&self, container: &str) -> ContainerResult<()> {
        self.runtime.destroy(container).await?;

        if !self.run_dir.remove(container)? {
            debug!(container = %container, "run record was already gone");
        }

        if let Some(dir) = self.config.instance_www_dir(container) {
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = ?dir, error = %e, "could not remove instance www directory");
                }
            }
        }

        info!(container = %container, "container stopped");
        Ok(())
    }

    fn build_invocation(
        &self,
        project: &ProjectSpec,
        container: &str,
        container_uuid: &str,
        instance_www: &Option<std::path::PathBuf>,
    ) -> LaunchInvocation {
        let mut invocation =
            LaunchInvocation::new(container, format!("/cvmfs/{}", project.bootstrap_path))
                .cvmfs(project.repository_list())
                .memory_kb(self.quota.mem_per_slot_kb)
                .swap_kb(self.quota.swap_per_slot_kb);

        if let Some(www) = instance_www {
            invocation = invocation.mount_entry(
                www,
                &self.config.guest_shared_mount,
                "defaults,bind,user",
            );
        }
        for bind in &self.config.bind_mounts {
            invocation = invocation.mount_entry(&bind.host, &bind.guest, "defaults,bind");
        }

        if let Some(meta) = &self.config.shared_meta {
            invocation = invocation.env("DUMBQ_METAFILE", format!("/{}", meta.guest));
        }
        for var in &self.env {
            invocation = invocation.env(format!("DUMBQ_{}", var.key), &var.value);
        }

        invocation
            .env("DUMBQ_NAME", &project.name)
            .env("DUMBQ_UUID", container_uuid)
            .env("DUMBQ_VMID", &self.host_uuid)
    }

    /// Best-effort teardown of a container whose admission failed
    /// half-way. The container never got a run record, so this is the
    /// only chance to reclaim it.
    async fn abandon(&self, container: &str) {
        if let Err(e) = self.runtime.destroy(container).await {
            warn!(container = %container, error = %e, "could not destroy abandoned container");
        }
    }
}

/// Create a world-readable directory for public www exposure.
fn create_public_dir(dir: &Path) -> ContainerResult<()> {
    use std::os::unix::fs::PermissionsExt;

    std::fs::create_dir_all(dir).map_err(|source| ContainerError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o555)).map_err(|source| {
        ContainerError::Io {
            path: dir.to_path_buf(),
            source,
        }
    })
}

/// Copy the shared metadata file to its guest-side location, creating
/// parent directories as needed.
fn copy_metadata(host: &Path, guest_path: &Path) -> ContainerResult<()> {
    if let Some(parent) = guest_path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| ContainerError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::copy(host, guest_path).map_err(|source| ContainerError::Io {
        path: guest_path.to_path_buf(),
        source,
    })?;
    Ok(())
}

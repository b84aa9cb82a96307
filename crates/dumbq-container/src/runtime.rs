//! The container runtime seam.
//!
//! [`ContainerRuntime`] abstracts the external launcher/destroyer and
//! list executables so lifecycle, sweep, and loop logic can be tested
//! against [`crate::mock::MockRuntime`]. The production [`ForkRuntime`]
//! shells out with a bounded timeout on every invocation — a hanging
//! external command is treated as an invocation failure rather than
//! stalling the daemon loop forever.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::debug;

use dumbq_core::Config;

use crate::error::{ContainerError, ContainerResult};
use crate::launch::LaunchInvocation;

/// Operations the daemon needs from the container runtime.
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Launch a container; resolves when the launcher exits.
    fn launch(
        &self,
        invocation: &LaunchInvocation,
    ) -> impl Future<Output = ContainerResult<()>> + Send;

    /// Destroy a container. Success is a zero launcher exit, nothing else.
    fn destroy(&self, container: &str) -> impl Future<Output = ContainerResult<()>> + Send;

    /// Every container known to the runtime, active or not.
    fn list_all(&self) -> impl Future<Output = ContainerResult<HashSet<String>>> + Send;

    /// Containers the runtime reports as currently alive.
    fn list_active(&self) -> impl Future<Output = ContainerResult<HashSet<String>>> + Send;

    /// Attach a container console to a tty. Blocks for the lifetime of
    /// the console session; only ever called from console attendants,
    /// never from the decision loop.
    fn attach(&self, container: &str, tty: u32)
    -> impl Future<Output = ContainerResult<()>> + Send;
}

/// Production runtime driving the external fork launcher.
pub struct ForkRuntime {
    launcher: PathBuf,
    lister: PathBuf,
    timeout: Duration,
}

impl ForkRuntime {
    pub fn new(config: &Config) -> Self {
        Self {
            launcher: config.launcher_bin.clone(),
            lister: config.lister_bin.clone(),
            timeout: config.command_timeout,
        }
    }

    /// Run a command to completion under the configured timeout.
    async fn run(&self, mut command: Command, label: &str) -> ContainerResult<std::process::Output> {
        command.stdin(Stdio::null()).kill_on_drop(true);
        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ContainerError::Timeout {
                command: label.to_string(),
            })?
            .map_err(|source| ContainerError::Spawn {
                command: label.to_string(),
                source,
            })?;
        debug!(command = label, status = %output.status, "external command finished");
        Ok(output)
    }

    async fn list(&self, active_only: bool) -> ContainerResult<HashSet<String>> {
        let mut command = Command::new(&self.lister);
        if active_only {
            command.arg("--active");
        }
        command.stdout(Stdio::piped()).stderr(Stdio::null());

        let label = if active_only {
            format!("{} --active", self.lister.display())
        } else {
            self.lister.display().to_string()
        };
        let output = self.run(command, &label).await?;
        if !output.status.success() {
            return Err(ContainerError::List {
                status: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

impl ContainerRuntime for ForkRuntime {
    async fn launch(&self, invocation: &LaunchInvocation) -> ContainerResult<()> {
        let mut command = Command::new(&self.launcher);
        command
            .args(invocation.to_args())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let label = format!("{} {}", self.launcher.display(), invocation.container());
        let output = self.run(command, &label).await?;
        if !output.status.success() {
            return Err(ContainerError::Launch {
                container: invocation.container().to_string(),
                status: output.status.to_string(),
            });
        }
        Ok(())
    }

    async fn destroy(&self, container: &str) -> ContainerResult<()> {
        let mut command = Command::new(&self.launcher);
        command
            .arg(container)
            .arg("-D")
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let label = format!("{} {container} -D", self.launcher.display());
        let output = self.run(command, &label).await?;
        if !output.status.success() {
            return Err(ContainerError::Destroy {
                container: container.to_string(),
                status: output.status.to_string(),
            });
        }
        Ok(())
    }

    async fn list_all(&self) -> ContainerResult<HashSet<String>> {
        self.list(false).await
    }

    async fn list_active(&self) -> ContainerResult<HashSet<String>> {
        self.list(true).await
    }

    async fn attach(&self, container: &str, tty: u32) -> ContainerResult<()> {
        // openvt hands the console over to the launcher's console mode.
        // No timeout: the session lives as long as the container console.
        let mut command = Command::new("openvt");
        command
            .args(["-w", "-f", "-c"])
            .arg(tty.to_string())
            .arg("--")
            .arg(&self.launcher)
            .arg(container)
            .arg("-C")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let status = command
            .status()
            .await
            .map_err(|source| ContainerError::Spawn {
                command: format!("openvt -c {tty}"),
                source,
            })?;
        if !status.success() {
            return Err(ContainerError::Launch {
                container: container.to_string(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

//! Typed launcher invocation builder.
//!
//! The launcher contract: container name first, `-n -d -f` mode flags
//! (non-interactive, detached, foreground fallback), `--run=` entry
//! point, `--cvmfs=` repository list, `-o` launcher options (cgroup
//! limits and mount entries), `-E` environment injections. Arguments are
//! handed to the process-exec primitive as a vector; nothing is shell
//! quoted.

use std::path::Path;

/// A fully composed launcher invocation for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchInvocation {
    container: String,
    run_path: String,
    repositories: String,
    memory_kb: u64,
    swap_kb: u64,
    mount_entries: Vec<String>,
    env: Vec<(String, String)>,
}

impl LaunchInvocation {
    pub fn new(container: impl Into<String>, run_path: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            run_path: run_path.into(),
            repositories: String::new(),
            memory_kb: 0,
            swap_kb: 0,
            mount_entries: Vec::new(),
            env: Vec::new(),
        }
    }

    /// Comma-separated repository list passed via `--cvmfs=`.
    pub fn cvmfs(mut self, repositories: impl Into<String>) -> Self {
        self.repositories = repositories.into();
        self
    }

    /// cgroup memory limit in KB.
    pub fn memory_kb(mut self, kb: u64) -> Self {
        self.memory_kb = kb;
        self
    }

    /// cgroup memory+swap limit in KB.
    pub fn swap_kb(mut self, kb: u64) -> Self {
        self.swap_kb = kb;
        self
    }

    /// Add a bind-mount entry. The guest path is relative to the
    /// container root.
    pub fn mount_entry(mut self, host: &Path, guest: &str, options: &str) -> Self {
        self.mount_entries.push(format!(
            "{} {} none {options} 0 0",
            host.display(),
            guest.trim_start_matches('/'),
        ));
        self
    }

    /// Inject one environment variable into the container.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    /// Environment injections in insertion order.
    pub fn env_vars(&self) -> &[(String, String)] {
        &self.env
    }

    /// Render the launcher argument vector.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            self.container.clone(),
            "-n".to_string(),
            "-d".to_string(),
            "-f".to_string(),
            format!("--run={}", self.run_path),
            format!("--cvmfs={}", self.repositories),
            "-o".to_string(),
            format!("lxc.cgroup.memory.limit_in_bytes = {}K", self.memory_kb),
            "-o".to_string(),
            format!("lxc.cgroup.memory.memsw.limit_in_bytes = {}K", self.swap_kb),
        ];
        for entry in &self.mount_entries {
            args.push("-o".to_string());
            args.push(format!("lxc.mount.entry = {entry}"));
        }
        for (key, value) in &self.env {
            args.push("-E".to_string());
            args.push(format!("{key}={value}"));
        }
        args
    }
}

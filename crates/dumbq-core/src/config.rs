//! Daemon configuration.
//!
//! One immutable [`Config`] struct, populated at startup from typed
//! defaults overridden by CLI flags. Components receive a shared reference
//! and never mutate it. Paths derived from the data directory (run dir,
//! tty dir, run-hours counter) are exposed as methods so they can never
//! drift from `data_dir`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

/// A `host[=guest]` bind mount forwarded into every container.
///
/// The guest side is stored relative (no leading `/`) because the
/// launcher's mount entries address guest paths relative to the
/// container root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindMount {
    pub host: PathBuf,
    pub guest: String,
}

impl BindMount {
    /// Parse a `host[=guest]` spec. The guest path defaults to the host
    /// path when omitted.
    pub fn parse(spec: &str) -> Self {
        let (host, guest) = match spec.split_once('=') {
            Some((h, g)) => (h, g),
            None => (spec, spec),
        };
        Self {
            host: PathBuf::from(host),
            guest: guest.trim_start_matches('/').to_string(),
        }
    }
}

/// The shared metadata file exposed to every container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaShare {
    /// Host-side file that gets copied into each container.
    pub host: PathBuf,
    /// Guest-side path (relative to the container root) where it lands.
    pub guest: String,
}

impl MetaShare {
    /// Parse a `shared[=guest]` spec without touching the filesystem.
    pub fn parse(spec: &str) -> Self {
        let (host, guest) = match spec.split_once('=') {
            Some((h, g)) => (h, g),
            None => (spec, spec),
        };
        Self {
            host: PathBuf::from(host),
            guest: guest.trim_start_matches('/').to_string(),
        }
    }

    /// Parse a spec and check the host file exists. A missing file means
    /// the feature is disabled, not an error.
    pub fn resolve(spec: &str) -> Option<Self> {
        let share = Self::parse(spec);
        if share.host.exists() {
            Some(share)
        } else {
            debug!(path = ?share.host, "shared metadata file not present, feature disabled");
            None
        }
    }
}

/// Immutable daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// The project catalog file.
    pub catalog_path: PathBuf,
    /// Preference-override file (chance boosts).
    pub preference_path: PathBuf,
    /// Daemon state directory (run records, tty reservations, counters).
    pub data_dir: PathBuf,
    /// Public web directory for the status index and per-instance data.
    /// `None` disables status publication and instance www mounts.
    pub www_dir: Option<PathBuf>,
    /// Guest-side directory the instance www dir is bind-mounted onto.
    pub guest_shared_mount: String,
    /// Host-side root under which container guest filesystems appear.
    pub container_root: PathBuf,
    /// Persisted host UUID (fallback identity source).
    pub uuid_path: PathBuf,
    /// `KEY=VALUE` host config consulted first for the host UUID.
    pub host_config_path: PathBuf,
    /// External container launcher/destroyer executable.
    pub launcher_bin: PathBuf,
    /// External container list executable.
    pub lister_bin: PathBuf,
    /// Removable-media env reader executable (optional).
    pub media_reader_bin: PathBuf,
    /// Local `KEY=VALUE` env injection file (optional).
    pub env_file: PathBuf,
    /// Shared metadata file copied into every container, when present.
    pub shared_meta: Option<MetaShare>,
    /// Extra bind mounts forwarded to the launcher.
    pub bind_mounts: Vec<BindMount>,
    /// First tty reserved for container consoles; 0 disables consoles.
    pub base_tty: u32,
    /// Upper bound applied to every external command invocation.
    pub command_timeout: Duration,
}

impl Config {
    /// Directory holding one run-record file per active container.
    pub fn run_dir(&self) -> PathBuf {
        self.data_dir.join("run")
    }

    /// Directory holding tty reservation files.
    pub fn tty_dir(&self) -> PathBuf {
        self.data_dir.join("tty")
    }

    /// Cumulative run-hours counter, maintained externally.
    pub fn runhours_path(&self) -> PathBuf {
        self.data_dir.join("runhours")
    }

    /// Public www directory of one container instance.
    pub fn instance_www_dir(&self, container: &str) -> Option<PathBuf> {
        self.www_dir
            .as_ref()
            .map(|www| www.join(format!("inst-{container}")))
    }

    /// Host-side path of a guest file inside a container's filesystem.
    pub fn guest_path(&self, container: &str, guest: &str) -> PathBuf {
        self.container_root
            .join(container)
            .join("root")
            .join(guest.trim_start_matches('/'))
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = PathBuf::from("/var/lib/dumbq");
        Self {
            catalog_path: PathBuf::from(
                "/cvmfs/sft.cern.ch/lcg/external/experimental/dumbq/server/default.conf",
            ),
            preference_path: data_dir.join("preference.conf"),
            data_dir,
            www_dir: Some(PathBuf::from("/var/www/html")),
            guest_shared_mount: "var/www/html".to_string(),
            container_root: PathBuf::from("/mnt/.rw/containers"),
            uuid_path: PathBuf::from("/var/lib/uuid"),
            host_config_path: PathBuf::from("/etc/cernvm/default.conf"),
            launcher_bin: PathBuf::from("/usr/bin/cernvm-fork"),
            lister_bin: PathBuf::from("lxc-ls"),
            media_reader_bin: PathBuf::from(
                "/cvmfs/sft.cern.ch/lcg/external/cernvm-copilot/bin/readFloppy.pl",
            ),
            env_file: PathBuf::from("/var/lib/user-data"),
            shared_meta: None,
            bind_mounts: Vec::new(),
            base_tty: 0,
            command_timeout: Duration::from_secs(120),
        }
    }
}

/// Create a directory (and parents) unless it already exists.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_mount_with_explicit_guest() {
        let bind = BindMount::parse("/data/shared=/srv/shared");
        assert_eq!(bind.host, PathBuf::from("/data/shared"));
        assert_eq!(bind.guest, "srv/shared");
    }

    #[test]
    fn bind_mount_defaults_guest_to_host() {
        let bind = BindMount::parse("/data/shared");
        assert_eq!(bind.host, PathBuf::from("/data/shared"));
        assert_eq!(bind.guest, "data/shared");
    }

    #[test]
    fn meta_share_strips_leading_slash() {
        let share = MetaShare::parse("/var/lib/dumbq-meta=/etc/meta");
        assert_eq!(share.host, PathBuf::from("/var/lib/dumbq-meta"));
        assert_eq!(share.guest, "etc/meta");
    }

    #[test]
    fn meta_share_resolve_missing_host_disables_feature() {
        assert!(MetaShare::resolve("/definitely/not/here=/etc/meta").is_none());
    }

    #[test]
    fn meta_share_resolve_existing_host() {
        let dir = tempfile::tempdir().unwrap();
        let meta = dir.path().join("meta");
        std::fs::write(&meta, "x").unwrap();
        let spec = format!("{}=/etc/meta", meta.display());
        let share = MetaShare::resolve(&spec).unwrap();
        assert_eq!(share.host, meta);
    }

    #[test]
    fn derived_paths_follow_data_dir() {
        let config = Config {
            data_dir: PathBuf::from("/tmp/dq"),
            ..Config::default()
        };
        assert_eq!(config.run_dir(), PathBuf::from("/tmp/dq/run"));
        assert_eq!(config.tty_dir(), PathBuf::from("/tmp/dq/tty"));
        assert_eq!(config.runhours_path(), PathBuf::from("/tmp/dq/runhours"));
    }

    #[test]
    fn instance_www_dir_requires_www() {
        let mut config = Config::default();
        assert_eq!(
            config.instance_www_dir("alice-x"),
            Some(PathBuf::from("/var/www/html/inst-alice-x"))
        );
        config.www_dir = None;
        assert_eq!(config.instance_www_dir("alice-x"), None);
    }

    #[test]
    fn guest_path_is_rooted_in_container() {
        let config = Config::default();
        assert_eq!(
            config.guest_path("alice-x", "/var/lib/dumbq-meta"),
            PathBuf::from("/mnt/.rw/containers/alice-x/root/var/lib/dumbq-meta")
        );
    }
}

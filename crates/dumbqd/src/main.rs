//! dumbqd — the DumbQ daemon binary.
//!
//! Assembles all subsystems and runs the perpetual scheduling loop:
//! - Catalog + preference overrides (fail-fast validation)
//! - Hardware profile + slot quotas
//! - Container lifecycle over the external fork launcher
//! - Reconciliation sweep
//! - Status publisher
//!
//! # Usage
//!
//! ```text
//! dumbqd --config /cvmfs/.../default.conf --webdir /var/www/html --tty 2
//! ```
//!
//! Exit codes: the loop never exits in steady state; 2 means a fatal
//! configuration/catalog error at startup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};

use dumbq_catalog::{Catalog, PreferenceOverrides};
use dumbq_container::{Console, ForkRuntime, Lifecycle};
use dumbq_core::{BindMount, Config, HardwareProfile, MetaShare, read_env_injections};
use dumbq_status::Publisher;
use dumbqd::Daemon;

/// Exit status for unrecoverable configuration problems.
const FATAL_CONFIG_EXIT: i32 = 2;

#[derive(Parser)]
#[command(name = "dumbqd", about = "DumbQ daemon — weighted workload scheduler", version)]
struct Cli {
    /// Source catalog file with the weighted project definitions.
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Preference override file that boosts project chances.
    #[arg(short = 'p', long = "pref")]
    pref: Option<PathBuf>,

    /// Bind a host file/directory into every guest: host[=guest].
    #[arg(short = 'b', long = "bind")]
    bind: Vec<String>,

    /// Guest directory exposed on the web directory.
    #[arg(short = 'S', long = "share")]
    share: Option<String>,

    /// Display container consoles on real ttys starting here (0 = off).
    #[arg(short = 't', long = "tty", default_value_t = 0)]
    tty: u32,

    /// Web directory for run-time information served to the end user.
    /// An empty value disables publication.
    #[arg(short = 'w', long = "webdir")]
    webdir: Option<String>,

    /// Metadata file shared with all guests: shared[=guest].
    #[arg(short = 'm', long = "meta")]
    meta: Option<String>,

    /// Daemon state directory.
    #[arg(long = "data-dir")]
    data_dir: Option<PathBuf>,

    /// Container launcher/destroyer executable.
    #[arg(long = "launcher")]
    launcher: Option<PathBuf>,

    /// Container list executable.
    #[arg(long = "lister")]
    lister: Option<PathBuf>,

    /// Timeout in seconds applied to every external command.
    #[arg(long = "command-timeout", default_value_t = 120)]
    command_timeout: u64,
}

fn build_config(cli: &Cli) -> Config {
    let mut config = Config::default();

    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
        config.preference_path = config.data_dir.join("preference.conf");
    }
    if let Some(catalog) = &cli.config {
        config.catalog_path = catalog.clone();
    }
    if let Some(pref) = &cli.pref {
        config.preference_path = pref.clone();
    }
    if let Some(webdir) = &cli.webdir {
        config.www_dir = if webdir.is_empty() {
            None
        } else {
            Some(PathBuf::from(webdir))
        };
    }
    if let Some(share) = &cli.share {
        config.guest_shared_mount = share.trim_start_matches('/').to_string();
    }
    if let Some(launcher) = &cli.launcher {
        config.launcher_bin = launcher.clone();
    }
    if let Some(lister) = &cli.lister {
        config.lister_bin = lister.clone();
    }

    config.bind_mounts = cli.bind.iter().map(|spec| BindMount::parse(spec)).collect();
    // The default metadata spec flows through the same existence check
    // as an explicit one: a missing file disables the feature.
    let meta_spec = cli.meta.as_deref().unwrap_or("/var/lib/dumbq-meta");
    config.shared_meta = MetaShare::resolve(meta_spec);
    config.base_tty = cli.tty;
    config.command_timeout = Duration::from_secs(cli.command_timeout);
    config
}

/// Create the daemon's working directories.
fn setup_directories(config: &Config) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    dumbq_core::config::ensure_dir(&config.data_dir)?;
    dumbq_core::config::ensure_dir(&config.run_dir())?;
    dumbq_core::config::ensure_dir(&config.tty_dir())?;
    if let Some(www) = &config.www_dir {
        dumbq_core::config::ensure_dir(www)?;
        // World-readable: a web server serves this tree.
        std::fs::set_permissions(www, std::fs::Permissions::from_mode(0o555))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,dumbqd=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        catalog = ?config.catalog_path,
        "DumbQ daemon started"
    );

    // Fail-fast: a corrupt catalog would silently skew admission ratios.
    let catalog = match Catalog::load(&config.catalog_path) {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(error = %e, "cannot start without a valid catalog");
            std::process::exit(FATAL_CONFIG_EXIT);
        }
    };
    let overrides = PreferenceOverrides::load(&config.preference_path);

    let profile = HardwareProfile::detect(&config)?;
    let quota = profile.slot_quota();
    info!(
        slots = profile.cores,
        cpu = quota.cpu_per_slot,
        mem_kb = quota.mem_per_slot_kb,
        swap_kb = quota.swap_per_slot_kb,
        "allocating slots"
    );
    if let Some(label) = profile.tty_range_label() {
        info!(range = %label, "reserving ttys for containers");
    }

    setup_directories(&config)?;
    let env = read_env_injections(&config).await;

    let runtime = Arc::new(ForkRuntime::new(&config));
    let config = Arc::new(config);
    let lifecycle = Arc::new(Lifecycle::new(
        runtime.clone(),
        config.clone(),
        &profile,
        env,
    ));

    let console = profile
        .tty_range()
        .map(|range| Console::new(runtime.clone(), config.tty_dir(), range));
    let publisher = config.www_dir.as_ref().map(|www| {
        Publisher::new(
            lifecycle.run_dir().clone(),
            www.clone(),
            config.runhours_path(),
            profile.host_uuid.clone(),
            env!("CARGO_PKG_VERSION"),
        )
    });
    if publisher.is_none() {
        warn!("no web directory configured, status publication disabled");
    }

    let daemon = Daemon::new(
        catalog,
        overrides,
        profile.cores,
        lifecycle,
        console,
        publisher,
    );
    daemon.run().await;
    Ok(())
}

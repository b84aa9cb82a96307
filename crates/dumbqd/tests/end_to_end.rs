//! End-to-end daemon scenario against the mock runtime.
//!
//! A two-core node with a 70/30 catalog: the daemon admits to capacity,
//! publishes both instances, survives a container dying behind its back,
//! and refills the freed slot on the next admission tick.

use std::path::Path;
use std::sync::Arc;

use dumbq_catalog::{Catalog, PreferenceOverrides};
use dumbq_container::mock::MockRuntime;
use dumbq_container::{Console, Lifecycle};
use dumbq_core::{Config, EnvInjection, HardwareProfile};
use dumbq_status::{Publisher, StatusDocument};
use dumbqd::Daemon;

const CATALOG: &str = "# weighted pair\nprojA:70:repoA:bootA\nprojB:30:repoB:bootB\n";

struct Node {
    _guard: tempfile::TempDir,
    daemon: Daemon<MockRuntime>,
    runtime: Arc<MockRuntime>,
    lifecycle: Arc<Lifecycle<MockRuntime>>,
    tty_dir: std::path::PathBuf,
    index: std::path::PathBuf,
}

fn node(base_tty: u32) -> Node {
    let guard = tempfile::tempdir().unwrap();
    let config = Config {
        data_dir: guard.path().join("dumbq"),
        www_dir: Some(guard.path().join("www")),
        base_tty,
        ..Config::default()
    };
    std::fs::create_dir_all(config.www_dir.as_ref().unwrap()).unwrap();
    std::fs::create_dir_all(config.tty_dir()).unwrap();

    let catalog = Catalog::parse(Path::new("e2e.conf"), CATALOG).unwrap();
    let runtime = Arc::new(MockRuntime::new());
    let profile = HardwareProfile::from_parts(2, 8_000_000, 4_000_000, "machine-1", base_tty);
    let config = Arc::new(config);
    let lifecycle = Arc::new(Lifecycle::new(
        runtime.clone(),
        config.clone(),
        &profile,
        vec![EnvInjection {
            key: "QUEUE".to_string(),
            value: "e2e".to_string(),
        }],
    ));
    lifecycle.run_dir().ensure().unwrap();

    let console = profile
        .tty_range()
        .map(|range| Console::new(runtime.clone(), config.tty_dir(), range));
    let publisher = Publisher::new(
        lifecycle.run_dir().clone(),
        config.www_dir.clone().unwrap(),
        config.runhours_path(),
        profile.host_uuid.clone(),
        "2.0.0",
    );
    let index = publisher.index_path();
    let tty_dir = config.tty_dir();

    Node {
        daemon: Daemon::new(
            catalog,
            PreferenceOverrides::default(),
            profile.cores,
            lifecycle.clone(),
            console,
            Some(publisher),
        ),
        _guard: guard,
        runtime,
        lifecycle,
        tty_dir,
        index,
    }
}

fn read_status(node: &Node) -> StatusDocument {
    serde_json::from_str(&std::fs::read_to_string(&node.index).unwrap()).unwrap()
}

#[tokio::test]
async fn fills_capacity_reclaims_and_refills() {
    let node = node(0);
    node.daemon.startup().await;

    // Startup publishes an empty document before anything is admitted.
    let document = read_status(&node);
    assert!(document.instances.is_empty());
    assert_eq!(document.machine_uuid, "machine-1");
    assert_eq!(document.version, "2.0.0");

    // Fill both slots.
    node.daemon.tick().await;
    node.daemon.tick().await;
    assert_eq!(node.lifecycle.run_dir().count().unwrap(), 2);

    let document = read_status(&node);
    assert_eq!(document.instances.len(), 2);
    for instance in &document.instances {
        let record: serde_json::Value = serde_json::from_str(instance).unwrap();
        let project = record["project"].as_str().unwrap();
        assert!(project == "projA" || project == "projB", "unexpected {project}");
        assert_eq!(record["cpus"], 1);
    }

    // Every launch carried the identity environment.
    for invocation in node.runtime.launches() {
        let keys: Vec<&str> = invocation
            .env_vars()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert!(keys.contains(&"DUMBQ_NAME"));
        assert!(keys.contains(&"DUMBQ_UUID"));
        assert!(keys.contains(&"DUMBQ_VMID"));
        assert!(keys.contains(&"DUMBQ_QUEUE"));
    }

    // One container dies without the daemon noticing.
    let victim = node
        .lifecycle
        .run_dir()
        .list()
        .unwrap()
        .into_iter()
        .next()
        .unwrap();
    node.runtime.kill(&victim);

    // The full-capacity tick sweeps it; the next one refills.
    node.daemon.tick().await;
    assert_eq!(node.lifecycle.run_dir().count().unwrap(), 1);
    node.daemon.tick().await;
    assert_eq!(node.lifecycle.run_dir().count().unwrap(), 2);

    // Status reflects the refilled node.
    assert_eq!(read_status(&node).instances.len(), 2);
}

#[tokio::test]
async fn consoles_take_one_tty_per_container() {
    let node = node(2);
    node.daemon.startup().await;

    node.daemon.tick().await;
    node.daemon.tick().await;

    // Two containers, ttys 2 and 3 reserved.
    assert!(node.tty_dir.join("tty2").exists());
    assert!(node.tty_dir.join("tty3").exists());
}

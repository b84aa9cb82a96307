//! Scriptable in-memory runtime for the test suites.
//!
//! Mirrors the external runtime's observable behavior: launched
//! containers join the alive set, destroy removes them, `kill` simulates
//! a container dying behind the daemon's back (it stays known to the
//! runtime but drops out of the active set, exactly what a finished or
//! crashed workload looks like to the lister).

use std::collections::HashSet;
use std::sync::Mutex;

use crate::error::{ContainerError, ContainerResult};
use crate::launch::LaunchInvocation;
use crate::runtime::ContainerRuntime;

#[derive(Default)]
struct MockState {
    alive: HashSet<String>,
    known: HashSet<String>,
    launches: Vec<LaunchInvocation>,
    destroys: Vec<String>,
    attaches: Vec<(String, u32)>,
    fail_launch: bool,
    fail_destroy: bool,
    fail_list: bool,
}

/// In-memory [`ContainerRuntime`] with scriptable failures.
#[derive(Default)]
pub struct MockRuntime {
    state: Mutex<MockState>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent launches fail.
    pub fn set_fail_launch(&self, fail: bool) {
        self.state.lock().unwrap().fail_launch = fail;
    }

    /// Make subsequent destroys fail.
    pub fn set_fail_destroy(&self, fail: bool) {
        self.state.lock().unwrap().fail_destroy = fail;
    }

    /// Make subsequent list queries fail.
    pub fn set_fail_list(&self, fail: bool) {
        self.state.lock().unwrap().fail_list = fail;
    }

    /// Simulate a container dying without the daemon noticing.
    pub fn kill(&self, container: &str) {
        self.state.lock().unwrap().alive.remove(container);
    }

    pub fn alive(&self) -> HashSet<String> {
        self.state.lock().unwrap().alive.clone()
    }

    /// Every launch invocation seen, in order.
    pub fn launches(&self) -> Vec<LaunchInvocation> {
        self.state.lock().unwrap().launches.clone()
    }

    /// Every destroy target seen, in order.
    pub fn destroys(&self) -> Vec<String> {
        self.state.lock().unwrap().destroys.clone()
    }

    pub fn attaches(&self) -> Vec<(String, u32)> {
        self.state.lock().unwrap().attaches.clone()
    }
}

impl ContainerRuntime for MockRuntime {
    async fn launch(&self, invocation: &LaunchInvocation) -> ContainerResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_launch {
            return Err(ContainerError::Launch {
                container: invocation.container().to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        let container = invocation.container().to_string();
        state.alive.insert(container.clone());
        state.known.insert(container);
        state.launches.push(invocation.clone());
        Ok(())
    }

    async fn destroy(&self, container: &str) -> ContainerResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_destroy || !state.known.contains(container) {
            return Err(ContainerError::Destroy {
                container: container.to_string(),
                status: "exit status: 1".to_string(),
            });
        }
        state.alive.remove(container);
        state.known.remove(container);
        state.destroys.push(container.to_string());
        Ok(())
    }

    async fn list_all(&self) -> ContainerResult<HashSet<String>> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(ContainerError::List {
                status: "exit status: 1".to_string(),
            });
        }
        Ok(state.known.clone())
    }

    async fn list_active(&self) -> ContainerResult<HashSet<String>> {
        let state = self.state.lock().unwrap();
        if state.fail_list {
            return Err(ContainerError::List {
                status: "exit status: 1".to_string(),
            });
        }
        Ok(state.alive.clone())
    }

    async fn attach(&self, container: &str, tty: u32) -> ContainerResult<()> {
        self.state
            .lock()
            .unwrap()
            .attaches
            .push((container.to_string(), tty));
        Ok(())
    }
}

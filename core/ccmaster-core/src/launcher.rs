//! Launcher contract (spec Design Notes, §1 external collaborators).
//!
//! Spawning a terminal running the worker command is explicitly out of
//! scope for this crate — the Terminal Launcher is named as an external
//! collaborator in spec §1. What belongs here is the trait boundary the
//! Session Lifecycle Manager (component G) calls through, so the rest of
//! the core can be exercised without an actual terminal emulator. Spec
//! Design Notes: "replacement launchers that drive headless workers
//! (pseudo-tty, subprocess pipe) should satisfy the same contract."

use crate::error::Result;
use crate::session::TerminalHandle;

/// Parameters needed to spawn a worker. `hook_config_path` and
/// `rpc_config_path` point at the per-worker configuration files the core
/// writes before launching (spec §6); the Launcher is responsible only for
/// getting the worker process running with `CCMASTER_SESSION_ID` set in
/// its environment, not for writing them.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub session_id: String,
    pub working_dir: String,
    pub hook_config_path: std::path::PathBuf,
    pub rpc_config_path: std::path::PathBuf,
}

/// External collaborator that spawns worker processes. Implementors own
/// whatever terminal/process mechanism they use; the core only sees the
/// opaque `TerminalHandle` that comes back.
pub trait Launcher: Send + Sync {
    fn launch(&self, request: &LaunchRequest) -> Result<TerminalHandle>;
}

/// In-memory Launcher used by tests and by any embedding that doesn't need
/// a real terminal (e.g. a headless worker pool). Records every request it
/// receives so tests can assert on launch order/parameters.
#[derive(Default)]
pub struct MockLauncher {
    pub requests: parking_lot::Mutex<Vec<LaunchRequest>>,
    pub next_handle: parking_lot::Mutex<u64>,
}

impl MockLauncher {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Launcher for MockLauncher {
    fn launch(&self, request: &LaunchRequest) -> Result<TerminalHandle> {
        self.requests.lock().push(request.clone());
        let mut next = self.next_handle.lock();
        *next += 1;
        Ok(TerminalHandle {
            handle: format!("mock-terminal-{next}"),
            metadata: serde_json::json!({ "session_id": request.session_id }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_launcher_records_requests_and_returns_distinct_handles() {
        let launcher = MockLauncher::new();
        let request = LaunchRequest {
            session_id: "mcp_a".to_string(),
            working_dir: "/tmp".to_string(),
            hook_config_path: "/tmp/hooks.json".into(),
            rpc_config_path: "/tmp/rpc.json".into(),
        };

        let first = launcher.launch(&request).unwrap();
        let second = launcher.launch(&request).unwrap();
        assert_ne!(first.handle, second.handle);
        assert_eq!(launcher.requests.lock().len(), 2);
    }
}

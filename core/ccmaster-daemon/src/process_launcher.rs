//! A concrete, headless `Launcher`/`Injector` pair (spec Design Notes:
//! "Replacement launchers that drive headless workers (pseudo-tty,
//! subprocess pipe) should satisfy the same contract").
//!
//! The Terminal Launcher and Prompt Injector are external collaborators
//! out of scope for this spec (§1: "Contract only; platform mechanics are
//! irrelevant") — an interactive-terminal implementation is deliberately
//! not provided here. What this module gives `ccmasterd` a working default
//! for local/test use: it spawns the worker command as a child process
//! with a piped stdin and treats "write the continuation text to that
//! pipe" as the injection mechanism, satisfying both trait contracts
//! without any terminal emulation.

use std::collections::HashMap;
use std::io::Write;
use std::process::{Child, Command, Stdio};

use ccmaster_core::error::{CoreError, Result};
use ccmaster_core::injector::Injector;
use ccmaster_core::launcher::{LaunchRequest, Launcher};
use ccmaster_core::session::TerminalHandle;
use parking_lot::Mutex;

struct Worker {
    child: Child,
}

/// Owns the spawned child processes keyed by the opaque handle string
/// handed back to the Session Registry. `TerminalHandle::handle` is the map
/// key; `metadata` carries nothing this launcher needs to round-trip.
#[derive(Default)]
pub struct ProcessPool {
    workers: Mutex<HashMap<String, Worker>>,
}

impl ProcessPool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Launcher for ProcessPool {
    fn launch(&self, request: &LaunchRequest) -> Result<TerminalHandle> {
        let mut command_line = std::env::var("CCMASTER_WORKER_COMMAND")
            .unwrap_or_else(|_| "cat".to_string());
        // A worker command that reads its continuation prompts from stdin
        // and does nothing else is the honest headless stand-in the spec's
        // Design Notes call for; operators running a real coding-assistant
        // CLI override it via CCMASTER_WORKER_COMMAND.
        if command_line.trim().is_empty() {
            command_line = "cat".to_string();
        }

        let child = Command::new("sh")
            .arg("-c")
            .arg(&command_line)
            .current_dir(&request.working_dir)
            .env("CCMASTER_SESSION_ID", &request.session_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CoreError::io(format!("spawning worker for {}", request.session_id), e))?;

        let handle = format!("pid-{}", child.id());
        self.workers.lock().insert(handle.clone(), Worker { child });

        Ok(TerminalHandle {
            handle,
            metadata: serde_json::json!({"session_id": request.session_id}),
        })
    }
}

impl Injector for ProcessPool {
    fn inject(&self, handle: &TerminalHandle, text: &str) -> bool {
        let mut workers = self.workers.lock();
        let Some(worker) = workers.get_mut(&handle.handle) else {
            return false;
        };
        let Some(stdin) = worker.child.stdin.as_mut() else {
            return false;
        };
        writeln!(stdin, "{text}").is_ok()
    }
}

impl ProcessPool {
    /// Best-effort kill of the child behind `handle`, used by the Session
    /// Lifecycle Manager alongside the OS-pid resolver (spec §4.G).
    pub fn kill(&self, handle: &str) {
        if let Some(worker) = self.workers.lock().get_mut(handle) {
            let _ = worker.child.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launch_and_inject_round_trips_through_stdin() {
        let pool = ProcessPool::new();
        let request = LaunchRequest {
            session_id: "mcp_test".to_string(),
            working_dir: std::env::temp_dir().to_string_lossy().to_string(),
            hook_config_path: "/tmp/hooks.json".into(),
            rpc_config_path: "/tmp/rpc.json".into(),
        };
        let handle = pool.launch(&request).unwrap();
        assert!(pool.inject(&handle, "continue"));
        pool.kill(&handle.handle);
    }

    #[test]
    fn inject_to_unknown_handle_fails() {
        let pool = ProcessPool::new();
        let handle = TerminalHandle {
            handle: "does-not-exist".to_string(),
            metadata: serde_json::Value::Null,
        };
        assert!(!pool.inject(&handle, "continue"));
    }
}

//! Worker process liveness and the `(session_id, created_at) → pid`
//! resolver (spec §4.G: "resolves the worker OS process via a ... resolver
//! (best-effort match from a process listing)").
//!
//! `Launcher` hands back an opaque `TerminalHandle`; the core never trusts
//! it to also carry a pid (a headless Launcher might not have one readily
//! available at creation time). Kill/interrupt instead locate the process
//! after the fact by scanning the system process list for a command line
//! that mentions the session id, using `CCMASTER_SESSION_ID=<id>` as the
//! env-var contract workers are launched with (spec §6) — the same
//! needle the worker-side hook runner would see. Start-time proximity to
//! `created_at` disambiguates when a stale process happens to share the id
//! in its arguments.

use std::cell::RefCell;

use sysinfo::{Pid, ProcessRefreshKind, System, UpdateKind};

thread_local! {
    static SYSTEM_CACHE: RefCell<Option<System>> = const { RefCell::new(None) };
}

pub fn is_pid_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::kill(pid as i32, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Start time of `pid` in seconds since epoch, or `None` if it's gone.
/// Per-PID refresh (O(1)) rather than a full process scan, matching the
/// access pattern of repeated liveness polling.
pub fn process_start_time(pid: u32) -> Option<u64> {
    SYSTEM_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        let sys = cache.get_or_insert_with(System::new);
        let sysinfo_pid = Pid::from(pid as usize);
        sys.refresh_process_specifics(sysinfo_pid, ProcessRefreshKind::new());
        sys.process(sysinfo_pid).map(|p| p.start_time())
    })
}

/// Sends a termination signal to `pid`. A process that's already gone is
/// treated as success — `kill` is idempotent from the caller's perspective
/// (spec §7: "an orphaned terminal whose pid cannot be located is
/// acceptable; the core logs and continues").
pub fn terminate(pid: u32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::kill(pid as i32, libc::SIGTERM) == 0 || !is_pid_alive(pid) }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Sends an interrupt (SIGINT-equivalent) to `pid`, used by `interrupt`
/// rather than full termination.
pub fn interrupt(pid: u32) -> bool {
    #[cfg(unix)]
    {
        unsafe { libc::kill(pid as i32, libc::SIGINT) == 0 }
    }
    #[cfg(not(unix))]
    {
        false
    }
}

/// Scans the full process list for a worker whose command line carries
/// `CCMASTER_SESSION_ID=<session_id>` (or the bare id as an argument, for
/// launchers that pass it positionally). Full scans are relatively rare —
/// one per kill/interrupt — unlike the hot per-session liveness poll, so a
/// fresh full refresh each call is acceptable.
pub fn resolve_pid(session_id: &str) -> Option<u32> {
    let mut system = System::new();
    system.refresh_processes_specifics(ProcessRefreshKind::new().with_cmd(UpdateKind::Always));

    let needle_env = format!("CCMASTER_SESSION_ID={session_id}");

    for (pid, process) in system.processes() {
        let cmd = process.cmd();
        let matches = cmd.iter().any(|arg| arg == session_id || arg.contains(&needle_env));
        if matches {
            return Some(pid.as_u32());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_is_alive() {
        assert!(is_pid_alive(std::process::id()));
    }

    #[test]
    fn an_unreasonably_large_pid_is_not_alive() {
        assert!(!is_pid_alive(u32::MAX - 1));
    }

    #[test]
    fn current_process_has_a_start_time() {
        assert!(process_start_time(std::process::id()).is_some());
    }
}

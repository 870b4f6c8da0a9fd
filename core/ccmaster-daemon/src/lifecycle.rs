//! Session Lifecycle Manager (component G, spec §4.G).

use ccmaster_core::identity;
use ccmaster_core::launcher::LaunchRequest;
use ccmaster_core::process;
use ccmaster_core::session::{CreatedBy, Session, SessionCurrentState, SessionStatus, generate_session_id};
use ccmaster_core::CoreError;

use crate::error::{DaemonError, DaemonResult};
use crate::hook_config;
use crate::logs;
use crate::state::AppState;

/// Command line the worker's host invokes for each hook (spec Design
/// Notes: "a tiny standalone binary parameterized by session id"). An
/// operator's `PATH` is expected to resolve this; it's not this crate's job
/// to locate the binary on disk.
const HOOK_BINARY: &str = "ccmaster-hook";

/// Grace window after an interrupt signal before the registry is forced to
/// `Idle` regardless of worker responsiveness (spec §4.G: "after a short
/// grace period").
const INTERRUPT_GRACE: std::time::Duration = std::time::Duration::from_millis(300);

pub struct CreateRequest {
    pub working_dir: String,
    pub watch_mode: bool,
    pub max_turns: Option<u32>,
    pub identity: Option<String>,
    pub created_by: CreatedBy,
}

/// `session(action=create)` (spec §4.G). Launcher failures mark the
/// session `Error` rather than propagating a hard RPC error (spec §7:
/// "LauncherFailure → session moves to Error; logged; other sessions
/// unaffected") — the call still returns `Ok` with the resulting session.
pub async fn create(state: &AppState, request: CreateRequest) -> DaemonResult<Session> {
    let session_id = generate_session_id();
    let mut session = Session::new(
        session_id.clone(),
        request.working_dir.clone(),
        request.watch_mode,
        request.max_turns,
        None,
        request.created_by,
    );
    state.registry.insert(session.clone());

    if let Some(identity) = request.identity {
        identity::set_identity(&state.registry, &session_id, &identity)?;
    }

    let (hook_path, rpc_path) = hook_config::default_paths(&request.working_dir, &session_id);
    if let Err(e) = hook_config::write_hook_settings(&hook_path, HOOK_BINARY, &session_id) {
        return Err(mark_error(state, &session_id, e).await);
    }
    if let Err(e) = hook_config::write_rpc_config(&rpc_path, &ccmaster_core::config::rpc_addr()) {
        return Err(mark_error(state, &session_id, e).await);
    }

    let launch_request = LaunchRequest {
        session_id: session_id.clone(),
        working_dir: request.working_dir,
        hook_config_path: hook_path,
        rpc_config_path: rpc_path,
    };

    match state.launcher.launch(&launch_request) {
        Ok(handle) => {
            session = state.registry.mutate(&session_id, |s| {
                s.terminal_handle = Some(handle);
            })?;
            let _ = logs::append_event(&state.paths, &session_id, "created");
            state.spawn_monitor(session_id);
        }
        Err(e) => {
            tracing::error!(session_id, error = %e, "launcher failed");
            session = state.registry.mutate(&session_id, |s| {
                s.status = SessionStatus::Error;
            })?;
            let _ = logs::append_event(&state.paths, &session_id, &format!("launcher_error: {e}"));
        }
    }

    Ok(session)
}

async fn mark_error(state: &AppState, session_id: &str, err: ccmaster_core::CoreError) -> DaemonError {
    let _ = state.registry.mutate(session_id, |s| s.status = SessionStatus::Error);
    DaemonError::Core(err)
}

/// `session(action=kill)` (spec §4.G). Idempotent: killing an
/// already-terminal session just returns its current record.
pub fn kill(state: &AppState, session_id: &str) -> DaemonResult<Session> {
    let session = state.registry.get(session_id)?;
    if session.status.is_terminal() {
        return Ok(session);
    }

    if let Some(pid) = process::resolve_pid(session_id) {
        if !process::terminate(pid) {
            tracing::warn!(session_id, pid, "failed to signal worker process");
        }
    } else {
        tracing::info!(session_id, "no worker process found, treating kill as a no-op on the OS side");
    }

    state.abort_monitor(session_id);
    let updated = state.registry.mutate(session_id, |s| {
        s.status = SessionStatus::Killed;
        s.ended_at = Some(chrono::Utc::now());
        s.pending_continue = false;
    })?;
    let _ = logs::append_event(&state.paths, session_id, "killed");
    Ok(updated)
}

/// `session(action=interrupt)` (spec §4.G, scenario S2). Requires
/// `current_state ∈ {Processing, Working}`.
pub fn interrupt(state: &AppState, session_id: &str, reason: Option<&str>) -> DaemonResult<Session> {
    let session = state.registry.get(session_id)?;
    if !matches!(
        session.current_state,
        SessionCurrentState::Processing | SessionCurrentState::Working
    ) {
        return Err(DaemonError::Core(CoreError::InvalidSessionState {
            session_id: session_id.to_string(),
            state: format!("{:?}", session.current_state).to_lowercase(),
            action: "interrupt".to_string(),
        }));
    }

    if let Some(pid) = process::resolve_pid(session_id) {
        process::interrupt(pid);
    }

    let updated = state.registry.mutate(session_id, |s| {
        s.current_state = SessionCurrentState::Idle;
        s.pending_continue = false;
    })?;
    let note = match reason {
        Some(reason) => format!("interrupted: {reason}"),
        None => "interrupted".to_string(),
    };
    let _ = logs::append_event(&state.paths, session_id, &note);
    Ok(updated)
}

/// Placeholder kept for documentation purposes: this implementation applies
/// the Idle-forcing immediately rather than after `INTERRUPT_GRACE`, since
/// the headless launcher (spec Design Notes) has no terminal to wait on for
/// a real acknowledgment. `INTERRUPT_GRACE` documents the spec's intended
/// window for implementations that do.
#[allow(dead_code)]
fn grace_window() -> std::time::Duration {
    INTERRUPT_GRACE
}

/// `kill_self` (spec §4.G, §6): the acting session id comes from the
/// invocation context, never an explicit parameter. `reason` is required,
/// mirroring the original's `kill_self(self, reason: str, final_message:
/// str = None)`; `final_message` is optional and logged alongside it.
pub fn self_terminate(
    state: &AppState,
    session_id: &str,
    reason: &str,
    final_message: Option<&str>,
) -> DaemonResult<Session> {
    let session = state.registry.get(session_id)?;
    if session.status.is_terminal() {
        return Ok(session);
    }

    if let Some(pid) = process::resolve_pid(session_id) {
        process::terminate(pid);
    }

    state.abort_monitor(session_id);
    let updated = state.registry.mutate(session_id, |s| {
        s.status = SessionStatus::SelfTerminated;
        s.ended_at = Some(chrono::Utc::now());
        s.pending_continue = false;
    })?;
    let note = match final_message {
        Some(final_message) => format!("self_terminated: {reason} ({final_message})"),
        None => format!("self_terminated: {reason}"),
    };
    let _ = logs::append_event(&state.paths, session_id, &note);
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmaster_core::config::Paths;
    use ccmaster_core::injector::MockInjector;
    use ccmaster_core::launcher::MockLauncher;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        AppState {
            registry: Arc::new(ccmaster_core::registry::SessionRegistry::new(paths.clone())),
            launcher: Arc::new(MockLauncher::new()),
            injector: Arc::new(MockInjector::new()),
            started_at: std::time::Instant::now(),
            monitors: Default::default(),
            #[cfg(test)]
            _temp_dir_guard: Some(Arc::new(dir)),
            paths,
        }
    }

    #[tokio::test]
    async fn create_spawns_a_monitor_and_reaches_active_eventually_starting() {
        let state = test_state();
        let session = create(
            &state,
            CreateRequest {
                working_dir: "/tmp".to_string(),
                watch_mode: true,
                max_turns: Some(3),
                identity: Some("alpha".to_string()),
                created_by: CreatedBy::User,
            },
        )
        .await
        .unwrap();

        assert_eq!(session.status, SessionStatus::Starting);
        assert!(session.terminal_handle.is_some());
        assert_eq!(session.identity.as_deref(), Some("alpha"));
    }

    #[test]
    fn interrupt_requires_processing_or_working() {
        let state = test_state();
        let mut session = Session::new("s1".to_string(), "/tmp".to_string(), false, None, None, CreatedBy::User);
        session.status = SessionStatus::Active;
        session.current_state = SessionCurrentState::Idle;
        state.registry.insert(session);

        let err = interrupt(&state, "s1", Some("x")).unwrap_err();
        assert!(matches!(err, DaemonError::Core(CoreError::InvalidSessionState { .. })));
    }

    #[test]
    fn scenario_s2_interrupt_forces_idle() {
        let state = test_state();
        let mut session = Session::new("b".to_string(), "/tmp".to_string(), false, None, None, CreatedBy::User);
        session.status = SessionStatus::Active;
        session.current_state = SessionCurrentState::Processing;
        state.registry.insert(session);

        let updated = interrupt(&state, "b", Some("x")).unwrap();
        assert_eq!(updated.current_state, SessionCurrentState::Idle);

        let err = interrupt(&state, "b", None).unwrap_err();
        assert!(matches!(err, DaemonError::Core(CoreError::InvalidSessionState { .. })));
    }

    #[test]
    fn kill_is_idempotent_on_terminal_sessions() {
        let state = test_state();
        let mut session = Session::new("s1".to_string(), "/tmp".to_string(), false, None, None, CreatedBy::User);
        session.status = SessionStatus::Killed;
        state.registry.insert(session);

        let result = kill(&state, "s1").unwrap();
        assert_eq!(result.status, SessionStatus::Killed);
    }
}

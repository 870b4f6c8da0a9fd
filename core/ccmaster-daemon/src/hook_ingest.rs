//! Hook Ingest (component E, spec §4.E).
//!
//! Translates the raw `HookState` a status-file write carries into the
//! session-visible `SessionCurrentState`, and the transition that results
//! into a `Transition` event the Auto-Continue Scheduler (component F)
//! reacts to. The derivation itself (`derive`) is pure and unit-tested in
//! isolation; `poll_once`/`run_monitor` are the side-effecting pieces that
//! wire it to the Status Store and the Session Registry.

use std::time::{Duration, SystemTime};

use ccmaster_core::config::Paths;
use ccmaster_core::registry::SessionRegistry;
use ccmaster_core::session::{Session, SessionStatus};
use ccmaster_core::status_store;
use ccmaster_protocol::status::{HookState, SessionCurrentState};

use crate::logs;
use crate::scheduler;
use crate::state::AppState;

/// Poll cadence for per-session monitors (spec §4.E: "≈ 100-250 ms").
pub const POLL_INTERVAL: Duration = Duration::from_millis(150);

/// A derived lifecycle transition, keyed on what the session's
/// `current_state` *becomes*. `CompletedTool` observations never produce a
/// `Transition` (spec §4.E: "intentionally ignored for state").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    ToProcessing,
    ToWorking,
    ToIdle,
}

impl Transition {
    pub fn target_state(self) -> SessionCurrentState {
        match self {
            Transition::ToProcessing => SessionCurrentState::Processing,
            Transition::ToWorking => SessionCurrentState::Working,
            Transition::ToIdle => SessionCurrentState::Idle,
        }
    }
}

/// Pure reducer: spec §4.E's table, `processing`/`working`/`idle` map
/// directly; `completed_tool` is observed-and-dropped.
pub fn derive(hook_state: HookState) -> Option<Transition> {
    match hook_state {
        HookState::Processing => Some(Transition::ToProcessing),
        HookState::Working => Some(Transition::ToWorking),
        HookState::CompletedTool => None,
        HookState::Idle => Some(Transition::ToIdle),
    }
}

/// Applies one transition to `session_id`'s registry record and returns the
/// updated session, or `None` if the session is gone (race with kill).
/// `has_seen_first_prompt` latches true on the first `Processing` transition
/// and never resets (spec §3).
pub fn apply_transition(
    registry: &SessionRegistry,
    session_id: &str,
    transition: Transition,
) -> Option<Session> {
    registry
        .mutate(session_id, |s| {
            s.current_state = transition.target_state();
            if transition == Transition::ToProcessing {
                s.has_seen_first_prompt = true;
            }
        })
        .ok()
}

/// One poll cycle for `session_id`: reads the Status Store, compares mtime
/// against `last_mtime` for idempotence (spec §4.E: "out-of-order files ...
/// tolerated by keying on the file's mtime"), and if this is a new
/// observation, derives and applies the transition, then hands an Idle
/// transition to the Scheduler. Returns the mtime actually observed so the
/// caller can carry it into the next cycle.
pub async fn poll_once(
    state: &AppState,
    session_id: &str,
    last_mtime: Option<SystemTime>,
) -> Option<SystemTime> {
    let observation = match status_store::read_status(&state.paths, session_id) {
        Ok(Some(obs)) => obs,
        Ok(None) => return last_mtime,
        Err(e) => {
            tracing::warn!(session_id, error = %e, "status read failed, will retry");
            return last_mtime;
        }
    };

    if Some(observation.mtime) == last_mtime {
        return last_mtime;
    }

    if let Some(transition) = derive(observation.record.state) {
        if let Some(session) = apply_transition(&state.registry, session_id, transition) {
            if session.status == SessionStatus::Starting {
                let _ = state.registry.mutate(session_id, |s| {
                    s.status = SessionStatus::Active;
                });
            }
            match transition {
                Transition::ToIdle => scheduler::on_idle(state, &session).await,
                Transition::ToProcessing => {
                    scheduler::on_processing(state, session_id);
                    if let Some(prompt) = observation.record.prompt.as_deref() {
                        let _ = logs::append_prompt(&state.paths, session_id, prompt);
                    }
                }
                Transition::ToWorking => {}
            }
        }
    }

    Some(observation.mtime)
}

/// Runs the per-session monitor loop until the session enters a terminal
/// status (spec §5: "terminated when the session enters a terminal
/// status"). One task per Active session, per spec §5's concurrency model.
pub async fn run_monitor(state: AppState, session_id: String) {
    let mut last_mtime: Option<SystemTime> = None;
    loop {
        match state.registry.get(&session_id) {
            Ok(session) if session.status.is_terminal() => {
                tracing::debug!(session_id, "monitor exiting, session terminal");
                return;
            }
            Err(_) => {
                tracing::debug!(session_id, "monitor exiting, session removed");
                return;
            }
            Ok(_) => {}
        }

        last_mtime = poll_once(&state, &session_id, last_mtime).await;
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_tool_produces_no_transition() {
        assert_eq!(derive(HookState::CompletedTool), None);
    }

    #[test]
    fn processing_working_idle_map_directly() {
        assert_eq!(derive(HookState::Processing), Some(Transition::ToProcessing));
        assert_eq!(derive(HookState::Working), Some(Transition::ToWorking));
        assert_eq!(derive(HookState::Idle), Some(Transition::ToIdle));
    }

    #[test]
    fn first_processing_transition_latches_has_seen_first_prompt() {
        let registry = SessionRegistry::new(Paths::from_base(std::path::PathBuf::from("/tmp/unused")));
        let session = Session::new(
            "s1".to_string(),
            "/tmp".to_string(),
            true,
            None,
            None,
            ccmaster_core::session::CreatedBy::User,
        );
        registry.insert(session);

        let updated = apply_transition(&registry, "s1", Transition::ToProcessing).unwrap();
        assert!(updated.has_seen_first_prompt);
        assert_eq!(updated.current_state, SessionCurrentState::Processing);
    }

    #[tokio::test]
    async fn processing_transition_with_prompt_appends_to_prompts_log() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        let registry = std::sync::Arc::new(SessionRegistry::new(paths.clone()));
        registry.insert(Session::new(
            "s1".to_string(),
            "/tmp".to_string(),
            false,
            None,
            None,
            ccmaster_core::session::CreatedBy::User,
        ));

        let mut record = ccmaster_protocol::status::StatusRecord::new(HookState::Processing);
        record.prompt = Some("hello there".to_string());
        ccmaster_core::status_store::write_status(&paths, "s1", &record).unwrap();

        let state = AppState {
            paths: paths.clone(),
            registry,
            launcher: std::sync::Arc::new(ccmaster_core::launcher::MockLauncher::new()),
            injector: std::sync::Arc::new(ccmaster_core::injector::MockInjector::new()),
            started_at: std::time::Instant::now(),
            monitors: Default::default(),
            #[cfg(test)]
            _temp_dir_guard: Some(std::sync::Arc::new(dir)),
        };

        poll_once(&state, "s1", None).await;

        let contents = std::fs::read_to_string(paths.prompts_log("s1")).unwrap();
        assert!(contents.contains("hello there"));
    }
}

//! Auto-Continue Scheduler (component F, spec §4.F, testable property 1/2,
//! scenario S1).
//!
//! Reacts to the Idle transitions Hook Ingest (component E) produces. The
//! decision itself (`decide`) is a pure function of a `Session` snapshot so
//! property 1 ("at most N injector calls over a session's lifetime") and
//! property 2 ("no injector call when unwatched or before the first
//! prompt") can be asserted without any async machinery; `on_idle` is the
//! side-effecting wrapper the monitor loop calls.

use std::time::Duration;

use ccmaster_core::registry::SessionRegistry;
use ccmaster_core::session::Session;

use crate::state::AppState;

/// The literal default continuation payload (spec §4.F step 3).
pub const DEFAULT_CONTINUE_PAYLOAD: &str = "continue";

/// Bounded timeout after which `pending_continue` clears even if no
/// `Processing` transition was observed (spec §4.F step 4: "≥ 10 s").
pub const PENDING_CONTINUE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Inject the continuation payload.
    Inject,
    /// Not in watch mode.
    NotWatched,
    /// Hasn't processed a first real prompt yet (invariant: no continuation
    /// before the worker has done anything).
    NoFirstPromptYet,
    /// A continue is already in flight for this session (invariant (i), or
    /// the direct-message-wins edge case of spec §4.F).
    AlreadyPending,
    /// `auto_continue_count >= max_turns`; watch is suspended (invariant (ii)).
    BudgetExhausted,
}

/// Pure decision function: spec §4.F steps 1-2, evaluated against a
/// snapshot of the session at the moment of an Idle transition.
pub fn decide(session: &Session) -> Decision {
    if !session.watch_mode {
        return Decision::NotWatched;
    }
    if !session.has_seen_first_prompt {
        return Decision::NoFirstPromptYet;
    }
    if session.pending_continue {
        return Decision::AlreadyPending;
    }
    if session.auto_continue_budget_exhausted() {
        return Decision::BudgetExhausted;
    }
    Decision::Inject
}

/// Side-effecting entry point the hook-ingest monitor calls on every Idle
/// transition. Applies `decide`'s outcome: on `Inject`, sets
/// `pending_continue`, bumps the counter, calls the Injector, and schedules
/// the bounded-timeout clear (spec §4.F steps 3-4). On `BudgetExhausted`,
/// disables watch mode for the session so future idle edges short-circuit
/// at `NotWatched` instead of re-deriving the same verdict every time (spec
/// §4.F step 2: "skip and disable watch for this session").
pub async fn on_idle(state: &AppState, session: &Session) {
    match decide(session) {
        Decision::Inject => apply_inject(state, session).await,
        Decision::BudgetExhausted => {
            tracing::info!(session_id = %session.session_id, "auto-continue budget exhausted, disabling watch");
            let _ = state
                .registry
                .mutate(&session.session_id, |s| s.watch_mode = false);
        }
        other => {
            tracing::trace!(session_id = %session.session_id, decision = ?other, "idle edge, no auto-continue");
        }
    }
}

async fn apply_inject(state: &AppState, session: &Session) {
    let session_id = session.session_id.clone();

    let updated = state.registry.mutate(&session_id, |s| {
        s.pending_continue = true;
        s.auto_continue_count += 1;
    });
    let Ok(updated) = updated else { return };

    let Some(handle) = updated.terminal_handle.clone() else {
        tracing::warn!(session_id, "auto-continue skipped: no terminal handle");
        return;
    };

    let ok = state.injector.inject(&handle, DEFAULT_CONTINUE_PAYLOAD);
    if !ok {
        // InjectorFailure (spec §7): clear pending_continue immediately so
        // the next Idle edge gets a fresh attempt, within the same budget.
        tracing::warn!(session_id, "injector failed, clearing pending_continue for retry");
        let _ = state.registry.mutate(&session_id, |s| s.pending_continue = false);
        return;
    }

    schedule_pending_timeout(state.registry.clone(), session_id);
}

fn schedule_pending_timeout(registry: std::sync::Arc<SessionRegistry>, session_id: String) {
    tokio::spawn(async move {
        tokio::time::sleep(PENDING_CONTINUE_TIMEOUT).await;
        let _ = registry.mutate(&session_id, |s| s.pending_continue = false);
    });
}

/// Called on every `Processing` transition: clears `pending_continue` (spec
/// §4.F step 4, the non-timeout path).
pub fn on_processing(state: &AppState, session_id: &str) {
    let _ = state.registry.mutate(session_id, |s| s.pending_continue = false);
}

/// Called by the `communicate` dispatcher before a direct prompt injection
/// (`send_message`/`send_to_member`/per-target `broadcast`) reaches a
/// session: marks a continue as pending so a racing Idle edge's
/// auto-continue is skipped for this edge only (spec §4.F: "the direct
/// message wins and the auto-continue attempt is skipped for this idle
/// edge only"). Idempotent if already pending.
pub fn note_direct_message(registry: &SessionRegistry, session_id: &str) {
    let _ = registry.mutate(session_id, |s| s.pending_continue = true);
}

//! The `session` tool (spec §4.H table): create, kill, get_status,
//! get_logs, watch, unwatch, interrupt, continue, spawn_temp, coordinate.

use std::time::Duration;

use ccmaster_core::session::{CreatedBy, SessionCurrentState, SessionStatus};
use ccmaster_core::CoreError;
use serde_json::{json, Value};

use crate::dispatch::args::{opt_bool, opt_str, opt_u32, require_str};
use crate::error::{DaemonError, DaemonResult};
use crate::lifecycle::{self, CreateRequest};
use crate::logs;
use crate::scheduler;
use crate::state::AppState;

/// Bound on `spawn_temp`'s wait-for-idle poll (distinct from the RPC
/// client's own 30 s convention, spec §5, since this is a server-side wait
/// inside a single request handler).
const SPAWN_TEMP_DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const SPAWN_TEMP_POLL: Duration = Duration::from_millis(200);

pub async fn handle(
    state: &AppState,
    action: &str,
    args: &Value,
    caller: Option<&str>,
) -> DaemonResult<Value> {
    match action {
        "create" => create(state, args, caller).await,
        "kill" => kill(state, args),
        "get_status" => get_status(state, args),
        "get_logs" => get_logs(state, args),
        "watch" => watch(state, args),
        "unwatch" => unwatch(state, args),
        "interrupt" => interrupt(state, args),
        "continue" => continue_session(state, args),
        "spawn_temp" => spawn_temp(state, args).await,
        "coordinate" => coordinate(state, args),
        other => Err(DaemonError::UnknownAction {
            tool: "session".to_string(),
            action: other.to_string(),
        }),
    }
}

fn created_by(caller: Option<&str>) -> CreatedBy {
    match caller {
        Some(id) => CreatedBy::Mcp { session_id: id.to_string() },
        None => CreatedBy::User,
    }
}

async fn create(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let working_dir = require_str(args, "working_dir")?.to_string();
    let request = CreateRequest {
        working_dir,
        watch_mode: opt_bool(args, "watch_mode").unwrap_or(false),
        max_turns: opt_u32(args, "max_turns"),
        identity: opt_str(args, "identity").map(str::to_string),
        created_by: created_by(caller),
    };
    let session = lifecycle::create(state, request).await?;
    Ok(json!(session))
}

fn kill(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let id = require_str(args, "id")?;
    let session = lifecycle::kill(state, id)?;
    Ok(json!(session))
}

fn get_status(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let id = require_str(args, "id")?;
    let session = state.registry.get(id)?;
    Ok(json!(session))
}

fn get_logs(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let id = require_str(args, "id")?;
    let tail = opt_u32(args, "tail").unwrap_or(100) as usize;
    let lines = logs::read_event_log(&state.paths, id, tail)?;
    Ok(json!({"session_id": id, "lines": lines}))
}

fn watch(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let id = require_str(args, "id")?;
    let max_turns = opt_u32(args, "max_turns");
    let session = state.registry.mutate(id, |s| {
        s.watch_mode = true;
        if let Some(max_turns) = max_turns {
            s.max_turns = Some(max_turns);
        }
    })?;
    Ok(json!(session))
}

fn unwatch(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let id = require_str(args, "id")?;
    let session = state.registry.mutate(id, |s| s.watch_mode = false)?;
    Ok(json!(session))
}

fn interrupt(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let id = require_str(args, "id")?;
    let reason = opt_str(args, "reason");
    let session = lifecycle::interrupt(state, id, reason)?;
    Ok(json!(session))
}

/// Manual continuation, distinct from the Scheduler's automatic one: works
/// regardless of `watch_mode`, but still requires `current_state = Idle`
/// (spec §7: "continue while Processing" is an `InvalidState` case), and
/// suppresses a racing auto-continue on the same idle edge (spec §4.F: "the
/// direct message wins").
fn continue_session(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let id = require_str(args, "id")?;
    let message = opt_str(args, "message").unwrap_or(scheduler::DEFAULT_CONTINUE_PAYLOAD);

    let session = state.registry.get(id)?;
    if session.current_state != SessionCurrentState::Idle {
        return Err(DaemonError::Core(CoreError::InvalidSessionState {
            session_id: id.to_string(),
            state: format!("{:?}", session.current_state).to_lowercase(),
            action: "continue".to_string(),
        }));
    }
    let handle = session
        .terminal_handle
        .clone()
        .ok_or_else(|| DaemonError::InvalidParams(format!("session {id} has no terminal handle")))?;

    scheduler::note_direct_message(&state.registry, id);
    let delivered = state.injector.inject(&handle, message);
    Ok(json!({"session_id": id, "delivered": delivered}))
}

/// `spawn_temp` (spec §4.H): `create(watch_mode=false, max_turns=1)` → wait
/// for Active → `send_message` → poll until Idle or timeout → collect logs
/// → `kill`.
async fn spawn_temp(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let working_dir = require_str(args, "working_dir")?.to_string();
    let message = require_str(args, "message")?.to_string();
    let timeout = args
        .get("timeout_secs")
        .and_then(Value::as_u64)
        .map(Duration::from_secs)
        .unwrap_or(SPAWN_TEMP_DEFAULT_TIMEOUT);

    let session = lifecycle::create(
        state,
        CreateRequest {
            working_dir,
            watch_mode: false,
            max_turns: Some(1),
            identity: None,
            created_by: CreatedBy::Mcp {
                session_id: "spawn_temp".to_string(),
            },
        },
    )
    .await?;

    if session.status == SessionStatus::Error {
        return Ok(json!({"session_id": session.session_id, "status": "error", "logs": []}));
    }

    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let current = state.registry.get(&session.session_id)?;
        if current.status == SessionStatus::Active {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(SPAWN_TEMP_POLL).await;
    }

    let current = state.registry.get(&session.session_id)?;
    if let Some(handle) = current.terminal_handle.clone() {
        state.injector.inject(&handle, &message);
    }

    loop {
        let current = state.registry.get(&session.session_id)?;
        if current.current_state == SessionCurrentState::Idle || current.status.is_terminal() {
            break;
        }
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(SPAWN_TEMP_POLL).await;
    }

    let lines = logs::read_event_log(&state.paths, &session.session_id, 1000).unwrap_or_default();
    let killed = lifecycle::kill(state, &session.session_id)?;

    Ok(json!({"session_id": killed.session_id, "status": killed.status, "logs": lines}))
}

/// `coordinate` (spec §4.H): templated per-recipient prompts, fire-and-forget.
fn coordinate(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let prompts = args
        .get("prompts")
        .and_then(Value::as_object)
        .ok_or_else(|| DaemonError::InvalidParams("missing object field: prompts".to_string()))?;

    let mut results = serde_json::Map::new();
    for (session_id, prompt) in prompts {
        let Some(prompt) = prompt.as_str() else {
            results.insert(session_id.clone(), json!({"success": false, "reason": "prompt not a string"}));
            continue;
        };
        let outcome = match state.registry.get(session_id) {
            Ok(session) => match session.terminal_handle.clone() {
                Some(handle) => {
                    scheduler::note_direct_message(&state.registry, session_id);
                    let ok = state.injector.inject(&handle, prompt);
                    json!({"success": ok})
                }
                None => json!({"success": false, "reason": "no terminal handle"}),
            },
            Err(_) => json!({"success": false, "reason": "not_found"}),
        };
        results.insert(session_id.clone(), outcome);
    }

    Ok(json!({"results": results}))
}

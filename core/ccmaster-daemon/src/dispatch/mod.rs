//! RPC Tool Dispatcher (component H, spec §4.H).
//!
//! `tools/call` carries a consolidated tool name (`session`, `communicate`,
//! `job`, `team`, `prompt`, `list_sessions`, `kill_self`) and a free-form
//! `arguments` object; every grouped tool further dispatches on an `action`
//! field inside `arguments`. `prompt`, `list_sessions`, and `kill_self` take
//! no action discriminator (spec §4.H table: `—`).

pub mod args;
mod communicate;
mod job;
mod session;
mod team;

use serde_json::{json, Value};

use crate::error::{DaemonError, DaemonResult};
use crate::lifecycle;
use crate::state::AppState;
use args::{opt_str, require_str};

/// Dispatches one `tools/call` invocation. `caller` is the acting session id
/// resolved by the RPC layer from the `CCMASTER_SESSION_ID`-equivalent
/// request header (spec §6); `None` for calls made outside any session
/// context (the human operator, or an un-headered test client).
pub async fn dispatch(
    state: &AppState,
    tool: &str,
    arguments: &Value,
    caller: Option<&str>,
) -> DaemonResult<Value> {
    match tool {
        "session" => {
            let action = require_action(arguments)?;
            session::handle(state, action, arguments, caller).await
        }
        "communicate" => {
            let action = require_action(arguments)?;
            communicate::handle(state, action, arguments, caller).await
        }
        "job" => {
            let action = require_action(arguments)?;
            job::handle(state, action, arguments, caller).await
        }
        "team" => {
            let action = require_action(arguments)?;
            team::handle(state, action, arguments, caller).await
        }
        "prompt" => prompt(arguments),
        "list_sessions" => list_sessions(state),
        "kill_self" => kill_self(state, arguments, caller),
        other => Err(DaemonError::UnknownTool(other.to_string())),
    }
}

fn require_action<'a>(arguments: &'a Value) -> DaemonResult<&'a str> {
    arguments
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| DaemonError::InvalidParams("missing or non-string field: action".to_string()))
}

/// `prompt` (spec §4.H table: "display message in supervisor console").
/// No registry mutation; the message is surfaced as a diagnostic event for
/// whatever operator console is watching the daemon's logs.
fn prompt(arguments: &Value) -> DaemonResult<Value> {
    let message = opt_str(arguments, "message").unwrap_or("");
    tracing::info!(message, "prompt from worker");
    Ok(json!({"displayed": true}))
}

fn list_sessions(state: &AppState) -> DaemonResult<Value> {
    let sessions = state.registry.all();
    Ok(json!({"sessions": sessions}))
}

/// `kill_self` (spec §4.H, §6): the acting session id comes from the
/// invocation context only, never from an explicit `id` argument.
/// `reason` is required (matching the original's schema); `final_message`
/// is optional.
fn kill_self(state: &AppState, arguments: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let reason = require_str(arguments, "reason")?;
    let final_message = opt_str(arguments, "final_message");
    let session = lifecycle::self_terminate(state, caller, reason, final_message)?;
    Ok(json!(session))
}

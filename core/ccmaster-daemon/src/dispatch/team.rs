//! The `team` tool (spec §4.H table, §4.I): `set_identity`, `list_members`.

use ccmaster_core::identity;
use serde_json::{json, Value};

use crate::dispatch::args::{opt_bool, require_str};
use crate::error::{DaemonError, DaemonResult};
use crate::state::AppState;

pub async fn handle(
    state: &AppState,
    action: &str,
    args: &Value,
    caller: Option<&str>,
) -> DaemonResult<Value> {
    match action {
        "set_identity" => set_identity(state, args, caller),
        "list_members" => list_members(state, args),
        other => Err(DaemonError::UnknownAction {
            tool: "team".to_string(),
            action: other.to_string(),
        }),
    }
}

fn set_identity(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let target = match args.get("session_id").and_then(Value::as_str) {
        Some(id) => id.to_string(),
        None => caller.ok_or(DaemonError::MissingCallerContext)?.to_string(),
    };
    let identity = require_str(args, "identity")?;
    identity::set_identity(&state.registry, &target, identity)?;
    let session = state.registry.get(&target)?;
    Ok(json!(session))
}

fn list_members(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let include_inactive = opt_bool(args, "include_inactive").unwrap_or(false);
    let members = identity::list_members(&state.registry, include_inactive);
    let members: Vec<Value> = members
        .into_iter()
        .map(|(identity, session_id)| json!({"identity": identity, "session_id": session_id}))
        .collect();
    Ok(json!({"members": members}))
}

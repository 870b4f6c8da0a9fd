//! The two `ccmaster://` resources exposed by `resources/list`/`resources/read`
//! (spec §4.H): `ccmaster://sessions` (full registry JSON) and
//! `ccmaster://status` (uptime plus active/total counts).

use serde_json::{json, Value};

use crate::error::{DaemonError, DaemonResult};
use crate::state::AppState;

pub const SESSIONS_URI: &str = "ccmaster://sessions";
pub const STATUS_URI: &str = "ccmaster://status";

pub fn list() -> Value {
    json!({
        "resources": [
            {"uri": SESSIONS_URI, "name": "sessions", "description": "Full session registry"},
            {"uri": STATUS_URI, "name": "status", "description": "Supervisor uptime and session counts"},
        ]
    })
}

pub fn read(state: &AppState, uri: &str) -> DaemonResult<Value> {
    match uri {
        SESSIONS_URI => Ok(json!({"sessions": state.registry.all()})),
        STATUS_URI => {
            let all = state.registry.all();
            let active = all.iter().filter(|s| s.status == ccmaster_core::session::SessionStatus::Active).count();
            Ok(json!({
                "uptime_secs": state.started_at.elapsed().as_secs(),
                "active_sessions": active,
                "total_sessions": all.len(),
            }))
        }
        other => Err(DaemonError::UnknownResource(other.to_string())),
    }
}

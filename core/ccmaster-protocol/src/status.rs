//! The `StatusRecord` on-disk schema (spec §3, §4.A).
//!
//! Hook scripts are the sole writers of `<status_dir>/<session_id>.json`,
//! one file per session, write-then-rename for atomicity. The Hook Ingest
//! component (E) is the sole reader; it polls on a fixed cadence rather than
//! subscribing, since the writer is an out-of-process, short-lived script.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The raw event a hook script reports. This is the wire vocabulary, not the
/// derived session state — `processing`/`working`/`idle` map directly onto
/// `SessionCurrentState`, but `completed_tool` is intentionally observed and
/// then dropped by the reducer (spec §4.E: "tools often arrive in runs").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookState {
    Processing,
    Working,
    CompletedTool,
    Idle,
}

/// The session-visible state the Hook Ingest / Session Registry track.
/// Distinct from `HookState`: this is what a session record settles into,
/// not the raw hook event that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionCurrentState {
    Starting,
    Idle,
    Processing,
    Working,
    Unknown,
}

impl Default for SessionCurrentState {
    fn default() -> Self {
        SessionCurrentState::Starting
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusRecord {
    pub state: HookState,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tool: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl StatusRecord {
    pub fn new(state: HookState) -> Self {
        Self {
            state,
            timestamp: Utc::now(),
            last_tool: None,
            current_action: None,
            prompt: None,
        }
    }
}

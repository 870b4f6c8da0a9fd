//! The `Session` record and its lifecycle (spec §3, §4.D, §4.G).
//!
//! A session is the unit of supervision: one worker process, one identity
//! slot, one row in the registry. `SessionStatus` is the terminal/non-terminal
//! lifecycle axis; `SessionCurrentState` (re-exported from
//! `ccmaster_protocol::status`) is the separate, higher-frequency "what is
//! the worker doing right now" axis fed by hooks. The original project kept
//! both in loosely related dict fields on the same record; here they stay
//! distinct enums so an invalid combination can't silently round-trip
//! through JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use ccmaster_protocol::status::SessionCurrentState;

/// Lifecycle state of a supervised session. Mutated only by the Session
/// Lifecycle Manager (component G) and the lazy-Ended sweep (spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Launcher invoked, terminal/hook arrival not yet confirmed.
    Starting,
    /// Terminal confirmed alive via first hook arrival.
    Active,
    /// Worker process death discovered lazily (spec §7): `find_pid` returned
    /// empty on a later touch, not an explicit kill.
    Ended,
    /// Killed by an explicit `session(action=kill)` call.
    Killed,
    /// Session terminated itself via `kill_self`.
    SelfTerminated,
    /// Launcher failure; other sessions are unaffected (spec §7).
    Error,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Starting => "starting",
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
            SessionStatus::Killed => "killed",
            SessionStatus::SelfTerminated => "self_terminated",
            SessionStatus::Error => "error",
        }
    }

    /// Invariant (iv): a session leaves Active only via kill, self-termination,
    /// or process death; all four non-Active/Starting states are permanent.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionStatus::Ended
                | SessionStatus::Killed
                | SessionStatus::SelfTerminated
                | SessionStatus::Error
        )
    }

    /// Whether a mail/job/broadcast may target this session. Delivery to a
    /// terminal session is a `NotFound`, not a silent no-op (spec §4.B/§4.C).
    pub fn accepts_delivery(self) -> bool {
        !self.is_terminal()
    }
}

/// How the session came to exist: a human operator, or an MCP tool call
/// issued by another session. The source id is carried so `team`
/// bookkeeping can attribute ancestry without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CreatedBy {
    User,
    Mcp { session_id: String },
}

/// Opaque handle to a worker's terminal/process, supplied by whatever
/// `Launcher` spawned it (spec Design Notes: "intentionally opaque; the
/// Launcher supplies a `(handle, metadata)` pair"). Core code never
/// interprets `handle` beyond passing it back to the Launcher/Injector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalHandle {
    pub handle: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub working_dir: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    #[serde(default)]
    pub current_state: SessionCurrentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_handle: Option<TerminalHandle>,
    pub watch_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub auto_continue_count: u32,
    /// Gates the first auto-continue (invariant: no continuation before the
    /// worker has processed at least one real prompt).
    #[serde(default)]
    pub has_seen_first_prompt: bool,
    /// Dedupe flag for in-flight auto-continues (invariant (i)).
    #[serde(default)]
    pub pending_continue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    pub created_by: CreatedBy,
}

impl Session {
    pub fn new(
        session_id: String,
        working_dir: String,
        watch_mode: bool,
        max_turns: Option<u32>,
        identity: Option<String>,
        created_by: CreatedBy,
    ) -> Self {
        Self {
            session_id,
            working_dir,
            created_at: Utc::now(),
            ended_at: None,
            status: SessionStatus::Starting,
            current_state: SessionCurrentState::default(),
            terminal_handle: None,
            watch_mode,
            max_turns,
            auto_continue_count: 0,
            has_seen_first_prompt: false,
            pending_continue: false,
            identity,
            created_by,
        }
    }

    /// Invariant (ii): once `auto_continue_count` reaches `max_turns`, watch
    /// is effectively suspended (the Scheduler must stop injecting) until
    /// something resets the counter.
    pub fn auto_continue_budget_exhausted(&self) -> bool {
        matches!(self.max_turns, Some(max) if self.auto_continue_count >= max)
    }
}

/// Generates a session id in the original project's literal format:
/// `"mcp_" + now.strftime("%Y%m%d_%H%M%S_%f")[:21]` — a 5-digit microsecond
/// fragment, not the full 6 digits `%f` would otherwise produce, since the
/// `[:21]` slice truncates the last digit. Kept byte-for-byte since
/// worker-side tooling and log greps outside this crate parse it.
pub fn generate_session_id() -> String {
    let now = Utc::now();
    let micros = format!("{:06}", now.timestamp_subsec_micros());
    format!("mcp_{}_{}", now.format("%Y%m%d_%H%M%S"), &micros[..5])
}

//! Daemon-level errors and their mapping onto the JSON-RPC wire (spec §7).
//!
//! `CoreError` already distinguishes not-found from invalid-state at the
//! store layer; this enum adds the dispatcher-only cases (unknown tool,
//! unknown action, missing caller context) and is the single place that
//! decides which JSON-RPC error code a given failure surfaces as. Spec §7:
//! "internal errors never leak a `Display` of a Rust type straight onto the
//! wire without an explicit code."

use ccmaster_protocol::rpc::{ErrorCode, JsonRpcError};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("unknown action {action} for tool {tool}")]
    UnknownAction { tool: String, action: String },

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("this action requires caller context (CCMASTER_SESSION_ID)")]
    MissingCallerContext,

    #[error(transparent)]
    Core(#[from] ccmaster_core::CoreError),
}

impl DaemonError {
    /// Maps to a JSON-RPC error, matching spec §7's error-kind table:
    /// NotFound/InvalidState round-trip as structured `InvalidParams`-style
    /// data (never as an opaque 500), everything else collapses to the
    /// closest JSON-RPC convention code.
    pub fn to_json_rpc(&self) -> JsonRpcError {
        use ccmaster_core::CoreError;

        match self {
            DaemonError::UnknownTool(name) => JsonRpcError::with_data(
                ErrorCode::MethodNotFound,
                format!("unknown tool: {name}"),
                serde_json::json!({"kind": "not_found", "tool": name}),
            ),
            DaemonError::UnknownAction { tool, action } => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("unknown action {action} for tool {tool}"),
                serde_json::json!({"kind": "invalid_params", "tool": tool, "action": action}),
            ),
            DaemonError::UnknownResource(uri) => JsonRpcError::with_data(
                ErrorCode::MethodNotFound,
                format!("unknown resource: {uri}"),
                serde_json::json!({"kind": "not_found", "uri": uri}),
            ),
            DaemonError::InvalidParams(msg) => {
                JsonRpcError::new(ErrorCode::InvalidParams, msg.clone())
            }
            DaemonError::MissingCallerContext => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                self.to_string(),
                serde_json::json!({"kind": "invalid_params"}),
            ),
            DaemonError::Core(CoreError::SessionNotFound(id)) => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("session not found: {id}"),
                serde_json::json!({"kind": "not_found", "session_id": id}),
            ),
            DaemonError::Core(CoreError::MailNotFound(id)) => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("mail not found: {id}"),
                serde_json::json!({"kind": "not_found", "mail_id": id}),
            ),
            DaemonError::Core(CoreError::JobNotFound(id)) => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("job not found: {id}"),
                serde_json::json!({"kind": "not_found", "job_id": id}),
            ),
            DaemonError::Core(CoreError::MemberNotFound(id)) => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("team member not found: {id}"),
                serde_json::json!({"kind": "not_found", "identity": id}),
            ),
            DaemonError::Core(CoreError::InvalidSessionState {
                session_id,
                state,
                action,
            }) => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("session {session_id} is {state}, cannot {action}"),
                serde_json::json!({
                    "kind": "invalid_state",
                    "session_id": session_id,
                    "state": state,
                    "action": action,
                }),
            ),
            DaemonError::Core(CoreError::IdentityTaken(identity)) => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("identity already taken: {identity}"),
                serde_json::json!({"kind": "invalid_state", "identity": identity}),
            ),
            DaemonError::Core(CoreError::InvalidJobState {
                job_id,
                status,
                action,
            }) => JsonRpcError::with_data(
                ErrorCode::InvalidParams,
                format!("job {job_id} is {status}, cannot {action}"),
                serde_json::json!({
                    "kind": "invalid_state",
                    "job_id": job_id,
                    "status": status,
                    "action": action,
                }),
            ),
            DaemonError::Core(other) => {
                tracing::error!(error = %other, "internal error");
                JsonRpcError::new(ErrorCode::InternalError, "internal error")
            }
        }
    }
}

pub type DaemonResult<T> = std::result::Result<T, DaemonError>;

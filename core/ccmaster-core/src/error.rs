//! Error types for `ccmaster-core` operations.

use std::path::PathBuf;

/// All errors `ccmaster-core` operations can return.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    // ─────────────────────────────────────────────────────────────────
    // Not found
    // ─────────────────────────────────────────────────────────────────
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Mail not found: {0}")]
    MailNotFound(String),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Team member not found: {0}")]
    MemberNotFound(String),

    // ─────────────────────────────────────────────────────────────────
    // Invalid state
    // ─────────────────────────────────────────────────────────────────
    #[error("Session {session_id} is in state {state}, cannot {action}")]
    InvalidSessionState {
        session_id: String,
        state: String,
        action: String,
    },

    #[error("Identity already taken by an active session: {0}")]
    IdentityTaken(String),

    #[error("Job {job_id} is {status}, cannot {action}")]
    InvalidJobState {
        job_id: String,
        status: String,
        action: String,
    },

    // ─────────────────────────────────────────────────────────────────
    // I/O
    // ─────────────────────────────────────────────────────────────────
    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("I/O error: {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("File vanished mid-read: {0}")]
    FileVanished(PathBuf),
}

pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CoreError::Io {
            context: context.into(),
            source,
        }
    }

    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        CoreError::Json {
            context: context.into(),
            source,
        }
    }
}

//! Base-directory resolution and the filesystem layout described in spec §6.
//!
//! ```text
//! status/<session_id>.json
//! sessions.json
//! logs/<session_id>.log
//! logs/<session_id>_prompts.log
//! mailbox/<session_id>/inbox/<mail_id>.json
//! mailbox/<session_id>/sent/<mail_id>.json
//! job_queue/<session_id>/<job_id>.json
//! hook_errors.log, user_prompt_debug.log
//! ```

use std::path::PathBuf;

use crate::error::{CoreError, Result};

const HOME_ENV: &str = "CCMASTER_HOME";
const RPC_ADDR_ENV: &str = "CCMASTER_RPC_ADDR";
const DEFAULT_RPC_ADDR: &str = "127.0.0.1:8080";

/// Resolves the ccmaster base directory: `$CCMASTER_HOME` if set, else
/// `~/.ccmaster`. Never panics; callers log and fall back where sensible.
pub fn base_dir() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(HOME_ENV) {
        return Ok(PathBuf::from(path));
    }
    let home = dirs::home_dir().ok_or(CoreError::HomeDirNotFound)?;
    Ok(home.join(".ccmaster"))
}

/// Resolves the loopback address the RPC dispatcher binds to.
pub fn rpc_addr() -> String {
    std::env::var(RPC_ADDR_ENV).unwrap_or_else(|_| DEFAULT_RPC_ADDR.to_string())
}

#[derive(Debug, Clone)]
pub struct Paths {
    pub base: PathBuf,
}

impl Paths {
    pub fn resolve() -> Result<Self> {
        Ok(Self { base: base_dir()? })
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self { base }
    }

    pub fn status_dir(&self) -> PathBuf {
        self.base.join("status")
    }

    pub fn status_file(&self, session_id: &str) -> PathBuf {
        self.status_dir().join(format!("{session_id}.json"))
    }

    pub fn sessions_snapshot(&self) -> PathBuf {
        self.base.join("sessions.json")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn session_log(&self, session_id: &str) -> PathBuf {
        self.logs_dir().join(format!("{session_id}.log"))
    }

    pub fn prompts_log(&self, session_id: &str) -> PathBuf {
        self.logs_dir().join(format!("{session_id}_prompts.log"))
    }

    pub fn mailbox_dir(&self) -> PathBuf {
        self.base.join("mailbox")
    }

    pub fn inbox_dir(&self, session_id: &str) -> PathBuf {
        self.mailbox_dir().join(session_id).join("inbox")
    }

    pub fn sent_dir(&self, session_id: &str) -> PathBuf {
        self.mailbox_dir().join(session_id).join("sent")
    }

    pub fn job_queue_dir(&self) -> PathBuf {
        self.base.join("job_queue")
    }

    pub fn session_queue_dir(&self, session_id: &str) -> PathBuf {
        self.job_queue_dir().join(session_id)
    }

    pub fn hook_errors_log(&self) -> PathBuf {
        self.base.join("hook_errors.log")
    }

    pub fn user_prompt_debug_log(&self) -> PathBuf {
        self.base.join("user_prompt_debug.log")
    }
}

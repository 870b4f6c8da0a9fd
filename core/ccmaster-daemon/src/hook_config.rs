//! Per-worker configuration files written before launch (spec §6).
//!
//! "Per-worker configuration files the core MUST write before launching a
//! worker: a settings file registering four hooks ... ; a project-level
//! RPC configuration file pointing the worker at the loopback RPC
//! endpoint." Both are plain JSON the worker's host reads at its own
//! startup; this module only owns writing them, not interpreting them.

use std::path::{Path, PathBuf};

use ccmaster_core::error::Result;
use ccmaster_core::fsutil::atomic_write_json;

/// One hook registration entry: which lifecycle point, and the command
/// line the worker's host should invoke (the `ccmaster-hook` binary,
/// parameterized by event and session id per spec Design Notes).
fn hook_entry(hook_binary: &str, event: &str, session_id: &str) -> serde_json::Value {
    serde_json::json!({
        "matcher": "*",
        "hooks": [{
            "type": "command",
            "command": format!("{hook_binary} {event} --session {session_id}"),
        }],
    })
}

/// Writes the worker settings file registering PreToolUse, PostToolUse,
/// Stop, and UserPromptSubmit (spec §6's literal four hooks).
pub fn write_hook_settings(path: &Path, hook_binary: &str, session_id: &str) -> Result<()> {
    let settings = serde_json::json!({
        "hooks": {
            "UserPromptSubmit": [hook_entry(hook_binary, "user-prompt-submit", session_id)],
            "PreToolUse": [hook_entry(hook_binary, "pre-tool-use", session_id)],
            "PostToolUse": [hook_entry(hook_binary, "post-tool-use", session_id)],
            "Stop": [hook_entry(hook_binary, "stop", session_id)],
        }
    });
    atomic_write_json(path, &settings)
}

/// Writes the project-level RPC configuration pointing the worker at the
/// loopback endpoint (spec §6).
pub fn write_rpc_config(path: &Path, rpc_addr: &str) -> Result<()> {
    let config = serde_json::json!({
        "ccmaster": {
            "rpc_url": format!("http://{rpc_addr}"),
        }
    });
    atomic_write_json(path, &config)
}

/// Default locations for the two files under a session's working directory,
/// mirroring where a worker's host conventionally looks for project-scoped
/// settings (a dotdir keyed by this project).
pub fn default_paths(working_dir: &str, session_id: &str) -> (PathBuf, PathBuf) {
    let base = Path::new(working_dir).join(".ccmaster").join(session_id);
    (base.join("settings.json"), base.join("rpc.json"))
}

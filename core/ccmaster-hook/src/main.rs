//! Worker-side hook runner (spec §1, §6).
//!
//! The actual hook mechanics — which lifecycle point invoked it, how its
//! stdout is wired back into the worker — are an external contract (spec
//! §1: "Contract only; platform mechanics are irrelevant"). What this
//! binary owns is the one thing spec §1 insists on: "write a status record
//! to a well-known path, return an affirmative JSON acknowledgment." It
//! MUST NOT ever fail the worker's turn (spec §6, §7): every path through
//! `main` ends by printing a single JSON line and exiting 0, even when the
//! status write itself fails — a write failure is logged to
//! `hook_errors.log`, never to stdout/stderr, and never changes the exit
//! code or the acknowledgment shape.

use std::io::Read;

use ccmaster_core::config::Paths;
use ccmaster_core::status_store::write_status;
use ccmaster_protocol::status::{HookState, StatusRecord};
use clap::{Parser, ValueEnum};

/// Mirrors the four hooks the core registers before launching a worker
/// (spec §6): PreToolUse, PostToolUse, Stop, UserPromptSubmit.
#[derive(Debug, Clone, Copy, ValueEnum)]
#[value(rename_all = "kebab-case")]
enum HookEvent {
    UserPromptSubmit,
    PreToolUse,
    PostToolUse,
    Stop,
}

impl HookEvent {
    fn state(self) -> HookState {
        match self {
            HookEvent::UserPromptSubmit => HookState::Processing,
            HookEvent::PreToolUse => HookState::Working,
            HookEvent::PostToolUse => HookState::CompletedTool,
            HookEvent::Stop => HookState::Idle,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "ccmaster-hook", about = "Writes a StatusRecord for one lifecycle event")]
struct Cli {
    /// Which lifecycle point fired.
    event: HookEvent,

    /// The session id this hook is reporting for.
    #[arg(long)]
    session: String,
}

/// Optional JSON the worker's hook wiring may pass on stdin, carrying
/// whatever detail it has about the event (spec §3 StatusRecord: `last_tool`,
/// `current_action`, `prompt` are all optional). Absent or malformed stdin
/// is not an error — an empty status record for the event is still useful.
#[derive(Debug, Default, serde::Deserialize)]
struct HookPayload {
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    current_action: Option<String>,
    #[serde(default)]
    prompt: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let payload = read_payload();

    if let Err(err) = run(&cli, &payload) {
        log_hook_error(&cli, &err);
    }

    // Always exit 0 with an affirmative acknowledgment (spec §6, §7):
    // worker interference is strictly forbidden regardless of what
    // happened above.
    println!("{}", serde_json::json!({"status": "ok"}));
}

fn run(cli: &Cli, payload: &HookPayload) -> Result<(), String> {
    let paths = Paths::resolve().map_err(|e| e.to_string())?;

    let mut record = StatusRecord::new(cli.event.state());
    record.last_tool = payload.tool_name.clone();
    record.current_action = payload.current_action.clone();
    record.prompt = payload.prompt.clone();

    if matches!(cli.event, HookEvent::UserPromptSubmit) {
        log_user_prompt_debug(&paths, &cli.session, payload.prompt.as_deref());
    }

    write_status(&paths, &cli.session, &record).map_err(|e| e.to_string())
}

/// Append-only diagnostic trail for `UserPromptSubmit` payloads (spec §6:
/// `user_prompt_debug.log`), separate from `hook_errors.log` — this fires on
/// every prompt submission, not just on a write failure.
fn log_user_prompt_debug(paths: &Paths, session_id: &str, prompt: Option<&str>) {
    let line = format!(
        "{} session={} prompt={:?}\n",
        chrono::Utc::now().to_rfc3339(),
        session_id,
        prompt.unwrap_or(""),
    );
    let path = paths.user_prompt_debug_log();
    if let Some(parent) = path.parent() {
        let _ = fs_err::create_dir_all(parent);
    }
    use std::io::Write;
    if let Ok(mut file) = fs_err::OpenOptions::new().create(true).append(true).open(path) {
        let _ = file.write_all(line.as_bytes());
    }
}

fn read_payload() -> HookPayload {
    let mut buf = String::new();
    if std::io::stdin().read_to_string(&mut buf).is_err() {
        return HookPayload::default();
    }
    if buf.trim().is_empty() {
        return HookPayload::default();
    }
    serde_json::from_str(&buf).unwrap_or_default()
}

/// Hooks are "noisy only to their own log file, never to stdout/stderr
/// visible to the worker" (spec §7). Failure to even append to that log is
/// swallowed — there is nowhere safer left to report it.
fn log_hook_error(cli: &Cli, err: &str) {
    let Ok(paths) = Paths::resolve() else { return };
    let line = format!(
        "{} session={} event={:?} error={}\n",
        chrono::Utc::now().to_rfc3339(),
        cli.session,
        cli.event,
        err
    );
    if let Some(parent) = paths.hook_errors_log().parent() {
        let _ = fs_err::create_dir_all(parent);
    }
    use std::io::Write;
    if let Ok(mut file) = fs_err::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.hook_errors_log())
    {
        let _ = file.write_all(line.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_to_state_mapping_matches_spec_table() {
        assert_eq!(HookEvent::UserPromptSubmit.state(), HookState::Processing);
        assert_eq!(HookEvent::PreToolUse.state(), HookState::Working);
        assert_eq!(HookEvent::PostToolUse.state(), HookState::CompletedTool);
        assert_eq!(HookEvent::Stop.state(), HookState::Idle);
    }

    #[test]
    fn run_writes_status_record_with_payload_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("CCMASTER_HOME", dir.path());

        let cli = Cli {
            event: HookEvent::PreToolUse,
            session: "mcp_test".to_string(),
        };
        let payload = HookPayload {
            tool_name: Some("Edit".to_string()),
            current_action: None,
            prompt: None,
        };
        run(&cli, &payload).unwrap();

        let paths = Paths::resolve().unwrap();
        let observation = ccmaster_core::status_store::read_status(&paths, "mcp_test")
            .unwrap()
            .expect("status written");
        assert_eq!(observation.record.state, HookState::Working);
        assert_eq!(observation.record.last_tool.as_deref(), Some("Edit"));

        std::env::remove_var("CCMASTER_HOME");
    }

    #[test]
    fn user_prompt_submit_appends_debug_log_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var("CCMASTER_HOME", dir.path());

        let cli = Cli {
            event: HookEvent::UserPromptSubmit,
            session: "mcp_test".to_string(),
        };
        let payload = HookPayload {
            tool_name: None,
            current_action: None,
            prompt: Some("fix the bug".to_string()),
        };
        run(&cli, &payload).unwrap();

        let paths = Paths::resolve().unwrap();
        let contents = std::fs::read_to_string(paths.user_prompt_debug_log()).unwrap();
        assert!(contents.contains("mcp_test"));
        assert!(contents.contains("fix the bug"));

        std::env::remove_var("CCMASTER_HOME");
    }
}

//! Append-only per-session event and prompt logs (spec §6).
//!
//! These are a *data* concern read back by `session(action=get_logs)`, not
//! a diagnostics concern — they are written directly here, never through
//! `tracing` (SPEC_FULL.md §10).

use std::io::Write;

use ccmaster_core::config::Paths;
use ccmaster_core::error::{CoreError, Result};
use chrono::Utc;
use fs_err as fs;

/// Appends one line to `logs/<session_id>.log`: a human-readable lifecycle
/// event trail (e.g. "created", "idle", "killed").
pub fn append_event(paths: &Paths, session_id: &str, event: &str) -> Result<()> {
    let path = paths.session_log(session_id);
    append_line(&path, &format!("{} {event}", Utc::now().to_rfc3339()))
}

/// Appends one JSONL record to `logs/<session_id>_prompts.log` (spec §6:
/// "JSONL user prompts, one object per line").
pub fn append_prompt(paths: &Paths, session_id: &str, prompt: &str) -> Result<()> {
    let path = paths.prompts_log(session_id);
    let record = serde_json::json!({"timestamp": Utc::now(), "prompt": prompt});
    append_line(&path, &record.to_string())
}

fn append_line(path: &std::path::Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| CoreError::io(format!("creating {}", parent.display()), e.into()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| CoreError::io(format!("opening {}", path.display()), e.into()))?;
    writeln!(file, "{line}").map_err(|e| CoreError::io(format!("writing {}", path.display()), e))?;
    Ok(())
}

/// Reads back the last `tail` lines of `logs/<session_id>.log` for
/// `session(action=get_logs)`. Missing file reads as empty, not an error —
/// a session that never emitted an event has nothing to show yet.
pub fn read_event_log(paths: &Paths, session_id: &str, tail: usize) -> Result<Vec<String>> {
    let path = paths.session_log(session_id);
    match fs::read_to_string(&path) {
        Ok(content) => {
            let lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
            let start = lines.len().saturating_sub(tail);
            Ok(lines[start..].to_vec())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(CoreError::io(format!("reading {}", path.display()), e.into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_log_appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        append_event(&paths, "s1", "created").unwrap();
        append_event(&paths, "s1", "idle").unwrap();

        let lines = read_event_log(&paths, "s1", 10).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("created"));
        assert!(lines[1].ends_with("idle"));
    }

    #[test]
    fn missing_log_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        assert_eq!(read_event_log(&paths, "nope", 10).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn get_logs_tail_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        for i in 0..5 {
            append_event(&paths, "s1", &format!("event-{i}")).unwrap();
        }
        let lines = read_event_log(&paths, "s1", 2).unwrap();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].ends_with("event-4"));
    }
}

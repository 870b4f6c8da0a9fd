//! Status Store reader (component A, spec §4.A).
//!
//! The worker-side hook runner (`ccmaster-hook`) is the sole writer of
//! `<status_dir>/<id>.json`; the script/binary itself is deliberately
//! trivial per spec §1 ("write a status record to a well-known path, return
//! an affirmative JSON acknowledgment") — it ships as its own tiny binary
//! per Design Notes, but `write_status` below is the one function it calls
//! into, kept here so the write-then-rename discipline lives next to the
//! reader rather than being re-implemented in the hook binary. Hook Ingest
//! (component E) polls the read side on a fixed cadence and keys on the
//! file's mtime for idempotence, since multiple hook events can race the
//! filesystem without any locking (spec: "no locking; last-writer-wins per
//! file").

use std::path::Path;
use std::time::SystemTime;

use ccmaster_protocol::status::StatusRecord;

use crate::config::Paths;
use crate::error::Result;
use crate::fsutil::{atomic_write_json, read_json_file};

/// Writes `record` for `session_id`, write-then-rename (spec §4.A). The
/// sole caller is the worker-side hook runner; Hook Ingest never writes.
pub fn write_status(paths: &Paths, session_id: &str, record: &StatusRecord) -> Result<()> {
    atomic_write_json(&paths.status_file(session_id), record)
}

/// A status observation paired with the file's modification time, so a
/// poller can detect "nothing new since last read" without trusting the
/// record's own `timestamp` field (which a worker under clock skew could
/// regress).
#[derive(Debug, Clone)]
pub struct Observation {
    pub record: StatusRecord,
    pub mtime: SystemTime,
}

/// Reads the current status record for `session_id`, if one has been
/// written yet. Returns `Ok(None)` both when the file is absent (worker
/// hasn't fired a hook yet) and when it's present but empty (write was
/// interrupted mid-rename) — both are "nothing to report", not errors.
pub fn read_status(paths: &Paths, session_id: &str) -> Result<Option<Observation>> {
    let path = paths.status_file(session_id);
    read_status_at(&path)
}

fn read_status_at(path: &Path) -> Result<Option<Observation>> {
    let mtime = match std::fs::metadata(path) {
        Ok(meta) => meta.modified().ok(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(crate::error::CoreError::io(format!("stat {}", path.display()), e)),
    };

    let record: Option<StatusRecord> = read_json_file(path)?;
    Ok(match (record, mtime) {
        (Some(record), Some(mtime)) => Some(Observation { record, mtime }),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccmaster_protocol::status::HookState;

    #[test]
    fn missing_status_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        assert!(read_status(&paths, "mcp_none").unwrap().is_none());
    }

    #[test]
    fn written_status_round_trips_with_mtime() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        crate::fsutil::atomic_write_json(
            &paths.status_file("mcp_a"),
            &StatusRecord::new(HookState::Working),
        )
        .unwrap();

        let observation = read_status(&paths, "mcp_a").unwrap().expect("record present");
        assert_eq!(observation.record.state, HookState::Working);
    }
}

//! Atomic single-record JSON file I/O shared by every flat-file store.
//!
//! Every store in this crate is "one JSON file per record" rather than one
//! big indexed file (spec §6 names the layout explicitly), so unlike the
//! teacher's `StateStore` there's no single `StoreFile{version, sessions}`
//! wrapper to load wholesale. What does carry over unchanged is the write
//! discipline: temp file in the same directory, flush, then rename, so a
//! reader never observes a half-written record.

use fs_err as fs;
use std::io::Write;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::{CoreError, Result};

/// Writes `value` to `path` atomically, creating parent directories as
/// needed. Concurrent writers to the *same* path must still coordinate
/// externally (the single-writer-per-resource rule, spec §5) — this only
/// guarantees readers never see a torn file.
pub fn atomic_write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| CoreError::io(format!("{} has no parent dir", path.display()), std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent")))?;
    fs::create_dir_all(parent).map_err(|e| CoreError::io(format!("creating {}", parent.display()), e.into()))?;

    let content = serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::json(format!("serializing {}", path.display()), e))?;

    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| CoreError::io(format!("creating temp file in {}", parent.display()), e))?;
    temp.write_all(content.as_bytes())
        .map_err(|e| CoreError::io(format!("writing {}", path.display()), e))?;
    temp.flush()
        .map_err(|e| CoreError::io(format!("flushing {}", path.display()), e))?;
    temp.persist(path)
        .map_err(|e| CoreError::io(format!("persisting {}", path.display()), e.error))?;

    Ok(())
}

/// Reads and deserializes `path`, returning `Ok(None)` if it doesn't exist.
/// A file that vanishes between the existence check and the read (the
/// hook-script race spec §7 calls out) surfaces as `CoreError::FileVanished`
/// rather than bubbling a raw `NotFound` io error, so callers can tell a
/// genuinely-missing record apart from a racing writer.
pub fn read_json_file<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }

    match fs::read_to_string(path) {
        Ok(content) => {
            if content.trim().is_empty() {
                return Ok(None);
            }
            let value = serde_json::from_str(&content)
                .map_err(|e| CoreError::json(format!("parsing {}", path.display()), e))?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(CoreError::FileVanished(path.to_path_buf())),
        Err(e) => Err(CoreError::io(format!("reading {}", path.display()), e.into())),
    }
}

/// Lists the record ids (file stems) present in `dir`, skipping anything
/// that isn't a `.json` file. Returns an empty vec for a missing directory
/// rather than erroring — an uncreated mailbox/job-queue directory means
/// "no records yet", not a filesystem fault.
pub fn list_record_ids(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| CoreError::io(format!("reading {}", dir.display()), e))? {
        let entry = entry.map_err(|e| CoreError::io(format!("reading entry in {}", dir.display()), e))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_string());
            }
        }
    }
    ids.sort();
    Ok(ids)
}

/// Removes a record file if present; a missing file is not an error (the
/// cancel/complete paths call this after already confirming existence, but
/// a racing cleanup elsewhere shouldn't turn into a crash).
pub fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CoreError::io(format!("removing {}", path.display()), e)),
    }
}

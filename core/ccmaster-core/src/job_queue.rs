//! Job Queue Store (component C, spec §3, testable property 5, scenario S6).
//!
//! One directory per assignee session holding one JSON file per job.
//! Status is a small state machine (`Pending → Doing → Done`, or
//! `Pending|Doing → Cancelled`); dependencies are recorded but never
//! enforced (spec Design Notes: "the spec declines to guess" whether
//! `Pending → Doing` auto-triggers on the assignee going idle — it
//! doesn't, matching the original).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Paths;
use crate::error::{CoreError, Result};
use crate::fsutil::{atomic_write_json, list_record_ids, read_json_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobPriority {
    P0,
    P1,
    P2,
}

impl JobPriority {
    /// Sort weight used by `list`: p0 first (scenario S6).
    fn rank(self) -> u8 {
        match self {
            JobPriority::P0 => 0,
            JobPriority::P1 => 1,
            JobPriority::P2 => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Doing,
    Done,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Doing => "doing",
            JobStatus::Done => "done",
            JobStatus::Cancelled => "cancelled",
        }
    }

    fn cancellable(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Doing)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub created_by: String,
    pub created_by_identity: String,
    pub assigned_to: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

/// Generates a job id: `job_` followed by an 8-hex-char truncated UUIDv4,
/// matching the original `f"job_{uuid.uuid4().hex[:8]}"`.
pub fn generate_job_id() -> String {
    format!("job_{}", &uuid::Uuid::new_v4().simple().to_string()[..8])
}

pub struct NewJob {
    pub title: String,
    pub description: String,
    pub priority: JobPriority,
    pub created_by: String,
    pub created_by_identity: String,
    pub assigned_to: String,
    pub deadline: Option<String>,
    pub dependencies: Vec<String>,
}

/// Creates and persists a new job in `pending` state under its assignee's
/// queue directory.
pub fn send_job(paths: &Paths, job: NewJob) -> Result<JobRecord> {
    let record = JobRecord {
        id: generate_job_id(),
        title: job.title,
        description: job.description,
        priority: job.priority,
        status: JobStatus::Pending,
        created_by: job.created_by,
        created_by_identity: job.created_by_identity,
        assigned_to: job.assigned_to.clone(),
        created_at: Utc::now(),
        deadline: job.deadline,
        dependencies: job.dependencies,
        started_at: None,
        completed_at: None,
        cancelled_at: None,
        cancelled_by: None,
        cancel_reason: None,
        result: None,
        artifacts: Vec::new(),
    };

    let path = paths
        .session_queue_dir(&job.assigned_to)
        .join(format!("{}.json", record.id));
    atomic_write_json(&path, &record)?;
    Ok(record)
}

/// Lists jobs assigned to `session_id`, optionally filtered by status or
/// priority, sorted p0-first and then by creation time (scenario S6).
pub fn list_jobs(
    paths: &Paths,
    session_id: &str,
    status_filter: Option<&[JobStatus]>,
    priority_filter: Option<&[JobPriority]>,
) -> Result<Vec<JobRecord>> {
    let dir = paths.session_queue_dir(session_id);
    let ids = list_record_ids(&dir)?;
    let mut jobs = Vec::new();
    for id in ids {
        let path = dir.join(format!("{id}.json"));
        if let Some(record) = read_json_file::<JobRecord>(&path)? {
            if let Some(statuses) = status_filter {
                if !statuses.contains(&record.status) {
                    continue;
                }
            }
            if let Some(priorities) = priority_filter {
                if !priorities.contains(&record.priority) {
                    continue;
                }
            }
            jobs.push(record);
        }
    }
    jobs.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then(a.created_at.cmp(&b.created_at))
    });
    Ok(jobs)
}

/// Locates a job by id, searching `prefer_session`'s own queue first and
/// falling back to scanning every queue directory — matching `cancel_job`'s
/// original search order. Returns the job's assignee alongside the record
/// so the caller can resolve the file path for a subsequent write.
fn find_job(paths: &Paths, job_id: &str, prefer_session: Option<&str>) -> Result<(String, JobRecord)> {
    if let Some(session_id) = prefer_session {
        let path = paths.session_queue_dir(session_id).join(format!("{job_id}.json"));
        if let Some(record) = read_json_file::<JobRecord>(&path)? {
            return Ok((session_id.to_string(), record));
        }
    }

    let queue_root = paths.job_queue_dir();
    if queue_root.exists() {
        let mut entries: Vec<_> = std::fs::read_dir(&queue_root)
            .map_err(|e| CoreError::io(format!("reading {}", queue_root.display()), e))?
            .filter_map(|e| e.ok())
            .collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            if !entry.path().is_dir() {
                continue;
            }
            let session_id = entry.file_name().to_string_lossy().to_string();
            if Some(session_id.as_str()) == prefer_session {
                continue;
            }
            let path = entry.path().join(format!("{job_id}.json"));
            if let Some(record) = read_json_file::<JobRecord>(&path)? {
                return Ok((session_id, record));
            }
        }
    }

    Err(CoreError::JobNotFound(job_id.to_string()))
}

/// Job status lookup (`job_status` tool action): searches every queue,
/// caller-agnostic.
pub fn get_status(paths: &Paths, job_id: &str) -> Result<JobRecord> {
    find_job(paths, job_id, None).map(|(_, record)| record)
}

/// Resolves one dependency id's status for `get_status`'s dependency report
/// (spec §4.C: "reports each dep's current status, `not_found` if absent").
/// Searches every queue, the same as `get_status` itself.
pub fn dependency_status(paths: &Paths, dep_id: &str) -> &'static str {
    match find_job(paths, dep_id, None) {
        Ok((_, record)) => record.status.as_str(),
        Err(_) => "not_found",
    }
}

/// Cancels a pending or doing job. Searches `caller`'s own queue first,
/// then every queue (the original does not require the caller to own the
/// job to cancel it).
pub fn cancel_job(
    paths: &Paths,
    job_id: &str,
    caller: &str,
    reason: Option<String>,
) -> Result<JobRecord> {
    let (session_id, mut record) = find_job(paths, job_id, Some(caller))?;
    if !record.status.cancellable() {
        return Err(CoreError::InvalidJobState {
            job_id: job_id.to_string(),
            status: record.status.as_str().to_string(),
            action: "cancel".to_string(),
        });
    }

    record.status = JobStatus::Cancelled;
    record.cancelled_at = Some(Utc::now());
    record.cancelled_by = Some(caller.to_string());
    record.cancel_reason = reason;

    let path = paths.session_queue_dir(&session_id).join(format!("{job_id}.json"));
    atomic_write_json(&path, &record)?;
    Ok(record)
}

/// Marks a job done. Unlike cancel, completion requires the caller to be
/// the assignee — the job must exist in the caller's own queue (spec
/// property 5: "`complete` requires caller == assignee").
pub fn complete_job(
    paths: &Paths,
    job_id: &str,
    caller: &str,
    result: String,
    artifacts: Vec<String>,
) -> Result<JobRecord> {
    let path = paths.session_queue_dir(caller).join(format!("{job_id}.json"));
    let mut record: JobRecord =
        read_json_file(&path)?.ok_or_else(|| CoreError::JobNotFound(job_id.to_string()))?;

    if !matches!(record.status, JobStatus::Pending | JobStatus::Doing) {
        return Err(CoreError::InvalidJobState {
            job_id: job_id.to_string(),
            status: record.status.as_str().to_string(),
            action: "complete".to_string(),
        });
    }

    record.status = JobStatus::Done;
    record.completed_at = Some(Utc::now());
    record.result = Some(result);
    record.artifacts = artifacts;

    atomic_write_json(&path, &record)?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_job(assigned_to: &str, priority: JobPriority, title: &str) -> NewJob {
        NewJob {
            title: title.to_string(),
            description: "desc".to_string(),
            priority,
            created_by: "caller".to_string(),
            created_by_identity: "caller".to_string(),
            assigned_to: assigned_to.to_string(),
            deadline: None,
            dependencies: vec![],
        }
    }

    #[test]
    fn job_id_has_expected_prefix_and_length() {
        let id = generate_job_id();
        assert!(id.starts_with("job_"));
        assert_eq!(id.len(), "job_".len() + 8);
    }

    #[test]
    fn scenario_s6_priority_ordering() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());

        send_job(&paths, new_job("x", JobPriority::P1, "a")).unwrap();
        send_job(&paths, new_job("x", JobPriority::P0, "b")).unwrap();
        send_job(&paths, new_job("x", JobPriority::P2, "c")).unwrap();
        send_job(&paths, new_job("x", JobPriority::P1, "d")).unwrap();

        let jobs = list_jobs(&paths, "x", None, None).unwrap();
        let titles: Vec<&str> = jobs.iter().map(|j| j.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn complete_requires_caller_to_be_assignee() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        let job = send_job(&paths, new_job("x", JobPriority::P1, "a")).unwrap();

        let err = complete_job(&paths, &job.id, "someone-else", "done".to_string(), vec![])
            .unwrap_err();
        assert!(matches!(err, CoreError::JobNotFound(_)));

        let completed = complete_job(&paths, &job.id, "x", "done".to_string(), vec![]).unwrap();
        assert_eq!(completed.status, JobStatus::Done);
    }

    #[test]
    fn cancel_rejects_done_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        let job = send_job(&paths, new_job("x", JobPriority::P0, "b")).unwrap();

        complete_job(&paths, &job.id, "x", "done".to_string(), vec![]).unwrap();
        let err = cancel_job(&paths, &job.id, "x", None).unwrap_err();
        assert!(matches!(err, CoreError::InvalidJobState { .. }));
    }

    #[test]
    fn cancel_succeeds_on_pending_job_found_via_global_scan() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        let job = send_job(&paths, new_job("x", JobPriority::P1, "a")).unwrap();

        let cancelled = cancel_job(&paths, &job.id, "someone-else", Some("nvm".to_string())).unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("nvm"));
    }

    #[test]
    fn dependency_status_reports_not_found_for_unresolved_id() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        assert_eq!(dependency_status(&paths, "job_doesnotexist"), "not_found");
    }

    #[test]
    fn dependency_status_resolves_across_queues() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        let dep = send_job(&paths, new_job("other-session", JobPriority::P1, "dep")).unwrap();
        complete_job(&paths, &dep.id, "other-session", "done".to_string(), vec![]).unwrap();

        assert_eq!(dependency_status(&paths, &dep.id), "done");
    }
}

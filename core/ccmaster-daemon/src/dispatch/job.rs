//! The `job` tool (spec §4.H table, §4.C): `send_to_session`,
//! `send_to_member`, `list`, `cancel`, `get_status`, `complete`.

use ccmaster_core::job_queue::{self, JobPriority, JobStatus, NewJob};
use ccmaster_core::{identity, CoreError};
use serde_json::{json, Value};

use crate::dispatch::args::{opt_str, require_str, str_list};
use crate::error::{DaemonError, DaemonResult};
use crate::state::AppState;

pub async fn handle(
    state: &AppState,
    action: &str,
    args: &Value,
    caller: Option<&str>,
) -> DaemonResult<Value> {
    match action {
        "send_to_session" => send_to_session(state, args, caller),
        "send_to_member" => send_to_member(state, args, caller),
        "list" => list(state, args, caller),
        "cancel" => cancel(state, args, caller),
        "get_status" => get_status(state, args),
        "complete" => complete(state, args, caller),
        other => Err(DaemonError::UnknownAction {
            tool: "job".to_string(),
            action: other.to_string(),
        }),
    }
}

fn parse_priority(value: Option<&str>) -> JobPriority {
    match value {
        Some("p0") => JobPriority::P0,
        Some("p2") => JobPriority::P2,
        _ => JobPriority::P1,
    }
}

fn parse_statuses(args: &Value) -> Option<Vec<JobStatus>> {
    let raw = str_list(args, "status");
    if raw.is_empty() {
        return None;
    }
    Some(
        raw.into_iter()
            .filter_map(|s| match s.as_str() {
                "pending" => Some(JobStatus::Pending),
                "doing" => Some(JobStatus::Doing),
                "done" => Some(JobStatus::Done),
                "cancelled" => Some(JobStatus::Cancelled),
                _ => None,
            })
            .collect(),
    )
}

fn parse_priorities(args: &Value) -> Option<Vec<JobPriority>> {
    let raw = str_list(args, "priority");
    if raw.is_empty() {
        return None;
    }
    Some(raw.into_iter().map(|p| parse_priority(Some(&p))).collect())
}

fn caller_identity(state: &AppState, caller: &str) -> String {
    state
        .registry
        .get(caller)
        .ok()
        .and_then(|s| s.identity)
        .unwrap_or_default()
}

fn build_job(
    state: &AppState,
    args: &Value,
    caller: &str,
    assigned_to: String,
) -> DaemonResult<Value> {
    let job = job_queue::send_job(
        &state.paths,
        NewJob {
            title: require_str(args, "title")?.to_string(),
            description: require_str(args, "description")?.to_string(),
            priority: parse_priority(opt_str(args, "priority")),
            created_by: caller.to_string(),
            created_by_identity: caller_identity(state, caller),
            assigned_to,
            deadline: opt_str(args, "deadline").map(str::to_string),
            dependencies: str_list(args, "dependencies"),
        },
    )?;
    Ok(json!(job))
}

fn send_to_session(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let assigned_to = require_str(args, "to")?.to_string();
    build_job(state, args, caller, assigned_to)
}

fn send_to_member(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let identity = require_str(args, "to")?;
    let assigned_to = identity::resolve(&state.registry, identity)
        .ok_or_else(|| DaemonError::Core(CoreError::MemberNotFound(identity.to_string())))?;
    build_job(state, args, caller, assigned_to)
}

fn list(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let session_id = match opt_str(args, "session_id") {
        Some(id) => id.to_string(),
        None => caller.ok_or(DaemonError::MissingCallerContext)?.to_string(),
    };
    let statuses = parse_statuses(args);
    let priorities = parse_priorities(args);
    let jobs = job_queue::list_jobs(&state.paths, &session_id, statuses.as_deref(), priorities.as_deref())?;
    Ok(json!({"jobs": jobs}))
}

fn cancel(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let job_id = require_str(args, "job_id")?;
    let reason = opt_str(args, "reason").map(str::to_string);
    let job = job_queue::cancel_job(&state.paths, job_id, caller, reason)?;
    Ok(json!(job))
}

/// `get_status` (spec §4.C): besides the job record itself, resolves every
/// dependency id to its current status across all queues (`not_found` if
/// the id doesn't resolve to any job) — dependencies are advisory metadata
/// the core never blocks on, so this is a read-only report, not a wait.
fn get_status(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let job_id = require_str(args, "job_id")?;
    let job = job_queue::get_status(&state.paths, job_id)?;

    let dependencies: Value = job
        .dependencies
        .iter()
        .map(|dep_id| {
            json!({
                "job_id": dep_id,
                "status": job_queue::dependency_status(&state.paths, dep_id),
            })
        })
        .collect();

    let mut value = serde_json::to_value(&job).unwrap_or(Value::Null);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("dependency_status".to_string(), dependencies);
    }
    Ok(value)
}

fn complete(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let job_id = require_str(args, "job_id")?;
    let result = require_str(args, "result")?.to_string();
    let artifacts = str_list(args, "artifacts");
    let job = job_queue::complete_job(&state.paths, job_id, caller, result, artifacts)?;
    Ok(json!(job))
}

//! The `communicate` tool (spec §4.H table, §4.B): `send_message`,
//! `send_to_member`, `broadcast`, `send_mail`, `check_mail`, `reply_mail`,
//! `list_mail`.

use std::collections::HashSet;

use ccmaster_core::mailbox::{self, MailRecord, Priority, ReplyRef};
use ccmaster_core::session::SessionCurrentState;
use ccmaster_core::{identity, CoreError};
use chrono::Utc;
use serde_json::{json, Value};

use crate::dispatch::args::{opt_bool, opt_str, require_str, str_list};
use crate::error::{DaemonError, DaemonResult};
use crate::scheduler;
use crate::state::AppState;

pub async fn handle(
    state: &AppState,
    action: &str,
    args: &Value,
    caller: Option<&str>,
) -> DaemonResult<Value> {
    match action {
        "send_message" => send_message(state, args),
        "send_to_member" => send_to_member(state, args),
        "broadcast" => broadcast(state, args, caller),
        "send_mail" => send_mail(state, args, caller),
        "check_mail" => check_mail(state, args, caller),
        "reply_mail" => reply_mail(state, args, caller),
        "list_mail" => list_mail(state, args, caller),
        other => Err(DaemonError::UnknownAction {
            tool: "communicate".to_string(),
            action: other.to_string(),
        }),
    }
}

fn inject_direct(state: &AppState, target_session_id: &str, message: &str) -> DaemonResult<()> {
    let session = state.registry.get(target_session_id)?;
    let handle = session
        .terminal_handle
        .ok_or_else(|| DaemonError::InvalidParams(format!("session {target_session_id} has no terminal handle")))?;

    scheduler::note_direct_message(&state.registry, target_session_id);
    state.injector.inject(&handle, message);
    Ok(())
}

fn send_message(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let to = require_str(args, "to")?;
    let message = require_str(args, "message")?;
    inject_direct(state, to, message)?;
    Ok(json!({"success": true, "to": to}))
}

fn send_to_member(state: &AppState, args: &Value) -> DaemonResult<Value> {
    let identity = require_str(args, "to")?;
    let message = require_str(args, "message")?;
    let session_id = identity::resolve(&state.registry, identity)
        .ok_or_else(|| DaemonError::Core(CoreError::MemberNotFound(identity.to_string())))?;
    inject_direct(state, &session_id, message)?;
    Ok(json!({"success": true, "to": session_id}))
}

/// Broadcast target-selection algorithm (spec §4.H, SPEC_FULL §4): start
/// from Active, replace with whitelist union if any whitelist is
/// non-empty, subtract both blacklists, subtract caller if
/// `exclude_self`. Per-target send requires `current_state = Idle`.
fn broadcast(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let message = require_str(args, "message")?;
    let exclude_self = opt_bool(args, "exclude_self").unwrap_or(false);
    if exclude_self && caller.is_none() {
        return Err(DaemonError::MissingCallerContext);
    }

    let whitelist_sessions: HashSet<String> = str_list(args, "whitelist_sessions").into_iter().collect();
    let whitelist_members: HashSet<String> = str_list(args, "whitelist_members")
        .into_iter()
        .filter_map(|identity| identity::resolve(&state.registry, &identity))
        .collect();
    let blacklist_sessions: HashSet<String> = str_list(args, "blacklist_sessions").into_iter().collect();
    let blacklist_members: HashSet<String> = str_list(args, "blacklist_members")
        .into_iter()
        .filter_map(|identity| identity::resolve(&state.registry, &identity))
        .collect();

    let active: HashSet<String> = state
        .registry
        .active_view()
        .into_iter()
        .map(|s| s.session_id)
        .collect();

    let whitelist_union: HashSet<String> = whitelist_sessions.union(&whitelist_members).cloned().collect();
    let mut targets: HashSet<String> = if whitelist_union.is_empty() {
        active.clone()
    } else {
        active.intersection(&whitelist_union).cloned().collect()
    };

    for id in blacklist_sessions.union(&blacklist_members) {
        targets.remove(id);
    }
    if exclude_self {
        if let Some(caller) = caller {
            targets.remove(caller);
        }
    }

    let mut targets: Vec<String> = targets.into_iter().collect();
    targets.sort();

    let mut results = serde_json::Map::new();
    let mut success_count = 0u32;
    let mut failed_count = 0u32;

    for target in &targets {
        let session = match state.registry.get(target) {
            Ok(s) => s,
            Err(_) => {
                failed_count += 1;
                results.insert(target.clone(), json!({"success": false, "reason": "not_found"}));
                continue;
            }
        };
        if session.current_state != SessionCurrentState::Idle {
            failed_count += 1;
            results.insert(target.clone(), json!({"success": false, "reason": "not idle"}));
            continue;
        }
        match inject_direct(state, target, message) {
            Ok(()) => {
                success_count += 1;
                results.insert(target.clone(), json!({"success": true}));
            }
            Err(e) => {
                failed_count += 1;
                results.insert(target.clone(), json!({"success": false, "reason": e.to_string()}));
            }
        }
    }

    Ok(json!({
        "success_count": success_count,
        "failed_count": failed_count,
        "results": results,
    }))
}

/// Resolves `to_sessions`/`to_members` into a concrete recipient list,
/// mirroring the original's `send_mail`: raw session ids are only accepted
/// if they name a session actually in the registry, and the "broadcast to
/// everyone active" fallback only fires when the caller gave no recipients
/// at all. An explicit but entirely-invalid list is a rejection, not a
/// silent broadcast.
fn resolve_recipients(state: &AppState, args: &Value) -> DaemonResult<Vec<String>> {
    let to_sessions = str_list(args, "to_sessions");
    let to_members = str_list(args, "to_members");

    if to_sessions.is_empty() && to_members.is_empty() {
        let mut recipients: Vec<String> =
            state.registry.active_view().into_iter().map(|s| s.session_id).collect();
        recipients.sort();
        return Ok(recipients);
    }

    let mut recipients: HashSet<String> = to_sessions
        .into_iter()
        .filter(|id| state.registry.contains(id))
        .collect();
    for identity in to_members {
        if let Some(session_id) = identity::resolve(&state.registry, &identity) {
            recipients.insert(session_id);
        }
    }

    if recipients.is_empty() {
        return Err(DaemonError::InvalidParams("No valid recipients found".to_string()));
    }

    let mut recipients: Vec<String> = recipients.into_iter().collect();
    recipients.sort();
    Ok(recipients)
}

fn caller_identity(state: &AppState, caller: &str) -> String {
    state
        .registry
        .get(caller)
        .ok()
        .and_then(|s| s.identity)
        .unwrap_or_default()
}

fn send_mail(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let subject = require_str(args, "subject")?.to_string();
    let body = require_str(args, "body")?.to_string();
    let priority = match opt_str(args, "priority") {
        Some("low") => Priority::Low,
        Some("high") => Priority::High,
        Some("urgent") => Priority::Urgent,
        _ => Priority::Normal,
    };

    let to = resolve_recipients(state, args)?;
    let to_names: Vec<String> = to
        .iter()
        .filter_map(|id| state.registry.get(id).ok().and_then(|s| s.identity))
        .collect();

    let record = MailRecord {
        id: mailbox::generate_mail_id(),
        from: caller.to_string(),
        from_identity: caller_identity(state, caller),
        to: to.clone(),
        to_names,
        subject,
        body,
        priority,
        timestamp: Utc::now(),
        read_by: Vec::new(),
        replies: Vec::new(),
    };

    let delivered = mailbox::deliver(&state.paths, &record)?;
    Ok(json!({"mail_id": record.id, "delivered": delivered, "to": to}))
}

fn check_mail(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let unread_only = opt_bool(args, "unread_only").unwrap_or(true);

    let mut mails = mailbox::list_inbox(&state.paths, caller)?;
    if unread_only {
        mails.retain(|m| !m.read_by.iter().any(|r| r == caller));
    }
    Ok(json!({"mail": mails}))
}

fn reply_mail(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let mail_id = require_str(args, "mail_id")?;
    let body = require_str(args, "body")?.to_string();
    let reply_all = opt_bool(args, "reply_all").unwrap_or(false);

    let original = mailbox::mark_read(&state.paths, caller, mail_id)?;

    let to = if reply_all {
        mailbox::reply_all_recipients(&original, caller)
    } else {
        vec![original.from.clone()]
    };
    let to_names: Vec<String> = to
        .iter()
        .filter_map(|id| state.registry.get(id).ok().and_then(|s| s.identity))
        .collect();

    let reply = MailRecord {
        id: mailbox::generate_mail_id(),
        from: caller.to_string(),
        from_identity: caller_identity(state, caller),
        to: to.clone(),
        to_names,
        subject: mailbox::reply_subject(&original.subject),
        body: body.clone(),
        priority: original.priority,
        timestamp: Utc::now(),
        read_by: Vec::new(),
        replies: Vec::new(),
    };
    mailbox::deliver(&state.paths, &reply)?;

    mailbox::record_reply(
        &state.paths,
        caller,
        mail_id,
        ReplyRef {
            mail_id: reply.id.clone(),
            from: caller.to_string(),
            timestamp: reply.timestamp,
            preview: body.chars().take(80).collect(),
        },
    )?;

    Ok(json!({"mail_id": reply.id, "to": to}))
}

fn list_mail(state: &AppState, args: &Value, caller: Option<&str>) -> DaemonResult<Value> {
    let caller = caller.ok_or(DaemonError::MissingCallerContext)?;
    let folder = opt_str(args, "folder").unwrap_or("all");
    let sender_filter = opt_str(args, "sender");
    let priority_filter = opt_str(args, "priority");
    let unread_only = opt_bool(args, "unread_only").unwrap_or(false);

    let mut tagged: Vec<(String, MailRecord)> = Vec::new();
    if folder == "inbox" || folder == "all" {
        for mail in mailbox::list_inbox(&state.paths, caller)? {
            tagged.push(("inbox".to_string(), mail));
        }
    }
    if folder == "sent" || folder == "all" {
        for mail in mailbox::list_sent(&state.paths, caller)? {
            tagged.push(("sent".to_string(), mail));
        }
    }

    tagged.retain(|(_, mail)| sender_filter.map_or(true, |s| mail.from == s));
    tagged.retain(|(_, mail)| {
        priority_filter.map_or(true, |p| {
            format!("{:?}", mail.priority).to_lowercase() == p
        })
    });
    if unread_only {
        tagged.retain(|(folder, mail)| folder != "inbox" || !mail.read_by.iter().any(|r| r == caller));
    }
    tagged.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));

    let mail: Vec<Value> = tagged
        .into_iter()
        .map(|(folder, mail)| {
            let mut value = serde_json::to_value(&mail).unwrap_or(Value::Null);
            if let Some(obj) = value.as_object_mut() {
                obj.insert("folder".to_string(), json!(folder));
            }
            value
        })
        .collect();

    Ok(json!({"mail": mail}))
}

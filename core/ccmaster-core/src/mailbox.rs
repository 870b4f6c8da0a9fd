//! Mailbox Store (component B, spec §3, §4 communicate actions).
//!
//! One immutable `MailRecord` is written per recipient inbox plus one
//! "sent" copy for the sender; `read_by`/`replies` on the inbox copies are
//! the only fields that mutate after creation (spec §3). Recipient
//! resolution (sessions, team members, default-to-all-active) lives in the
//! RPC dispatcher (component H), which has the Session Registry in scope —
//! this module only knows how to persist and query records once recipients
//! are already resolved to session ids.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Paths;
use crate::error::{CoreError, Result};
use crate::fsutil::{atomic_write_json, list_record_ids, read_json_file};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Normal
    }
}

/// A reference to a reply, recorded on the original mail (spec §3: "the
/// sent copy is immutable" — replies are tracked on the *inbox* copy that
/// received them, never on the sender's sent copy).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyRef {
    pub mail_id: String,
    pub from: String,
    pub timestamp: DateTime<Utc>,
    pub preview: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRecord {
    pub id: String,
    pub from: String,
    pub from_identity: String,
    pub to: Vec<String>,
    #[serde(default)]
    pub to_names: Vec<String>,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub read_by: Vec<String>,
    #[serde(default)]
    pub replies: Vec<ReplyRef>,
}

/// Generates a mail id in the original project's format: an 8-hex-char
/// truncated UUIDv4 (`str(uuid.uuid4())[:8]`), not a full hyphenated UUID.
pub fn generate_mail_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Persists `record` into every recipient's inbox and the sender's sent
/// folder. Per spec §5 ("broadcasts are not atomic: partial delivery is a
/// normal outcome"), a failure writing to one recipient does not roll back
/// writes already made to others — the caller gets back the count that
/// actually succeeded.
pub fn deliver(paths: &Paths, record: &MailRecord) -> Result<usize> {
    let mut delivered = 0;
    for recipient in &record.to {
        let path = paths.inbox_dir(recipient).join(format!("{}.json", record.id));
        atomic_write_json(&path, record)?;
        delivered += 1;
    }

    let sent_path = paths.sent_dir(&record.from).join(format!("{}.json", record.id));
    atomic_write_json(&sent_path, record)?;

    Ok(delivered)
}

/// Loads every mail in `session_id`'s inbox, most recently delivered first
/// (the original orders by file mtime; this crate's writer sets `timestamp`
/// at creation time so sorting on that field is equivalent and avoids a
/// second `stat` per file).
pub fn list_inbox(paths: &Paths, session_id: &str) -> Result<Vec<MailRecord>> {
    load_folder(&paths.inbox_dir(session_id))
}

pub fn list_sent(paths: &Paths, session_id: &str) -> Result<Vec<MailRecord>> {
    load_folder(&paths.sent_dir(session_id))
}

fn load_folder(dir: &std::path::Path) -> Result<Vec<MailRecord>> {
    let ids = list_record_ids(dir)?;
    let mut mails = Vec::new();
    for id in ids {
        let path = dir.join(format!("{id}.json"));
        match read_json_file::<MailRecord>(&path) {
            Ok(Some(record)) => mails.push(record),
            Ok(None) => {}
            Err(CoreError::FileVanished(_)) => {
                tracing::warn!(path = %path.display(), "mail file vanished mid-read, skipping");
            }
            Err(e) => return Err(e),
        }
    }
    mails.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(mails)
}

/// Marks `mail_id` as read by `session_id` in its own inbox, if not already.
/// A no-op (not an error) if the mail is already marked read — idempotent
/// by design since `check_mail` and `reply_mail` both call this.
pub fn mark_read(paths: &Paths, session_id: &str, mail_id: &str) -> Result<MailRecord> {
    let path = paths.inbox_dir(session_id).join(format!("{mail_id}.json"));
    let mut record: MailRecord = read_json_file(&path)?
        .ok_or_else(|| CoreError::MailNotFound(mail_id.to_string()))?;

    if !record.read_by.iter().any(|r| r == session_id) {
        record.read_by.push(session_id.to_string());
        atomic_write_json(&path, &record)?;
    }
    Ok(record)
}

/// Appends a reply reference to the original mail in `session_id`'s inbox.
/// Called after the reply itself has been delivered via `deliver`.
pub fn record_reply(
    paths: &Paths,
    session_id: &str,
    mail_id: &str,
    reply: ReplyRef,
) -> Result<()> {
    let path = paths.inbox_dir(session_id).join(format!("{mail_id}.json"));
    let mut record: MailRecord = read_json_file(&path)?
        .ok_or_else(|| CoreError::MailNotFound(mail_id.to_string()))?;
    record.replies.push(reply);
    atomic_write_json(&path, &record)
}

/// Resolves reply-all recipients per the original semantics: sender first,
/// then every original recipient except the replier, de-duplicated.
pub fn reply_all_recipients(original: &MailRecord, replier: &str) -> Vec<String> {
    let mut recipients = vec![original.from.clone()];
    for recipient in &original.to {
        if recipient != replier && !recipients.contains(recipient) {
            recipients.push(recipient.clone());
        }
    }
    recipients
}

/// Prefixes a subject with `"Re: "` unless it already carries one.
pub fn reply_subject(original_subject: &str) -> String {
    if original_subject.starts_with("Re: ") {
        original_subject.to_string()
    } else {
        format!("Re: {original_subject}")
    }
}

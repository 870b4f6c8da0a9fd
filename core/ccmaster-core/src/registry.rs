//! Session Registry (component D, spec §4.D, §5).
//!
//! The in-memory authoritative map of sessions. Every cross-session field
//! the original scattered across parallel dicts (`watch_modes`,
//! `current_status`, `pending_continues`, `auto_continue_counts`,
//! `has_seen_first_prompt`, `max_turns`, `session_identities`,
//! `team_members`, ...) lives instead as a field on one `Session` record,
//! and the whole map sits behind a single `parking_lot::RwLock` — the
//! "single mutex" policy spec §5 calls out as one acceptable option, chosen
//! here because the Registry is explicitly the only hot contended
//! structure and a coherent single lock is simpler to reason about than
//! per-session partitioning for a map this size.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::config::Paths;
use crate::error::{CoreError, Result};
use crate::fsutil::atomic_write_json;
use crate::session::{Session, SessionStatus};

/// Authoritative in-memory session map plus a best-effort durable mirror.
/// Mutations go through `&self` methods taking the write lock; readers take
/// the read lock and get an internally consistent (if possibly stale)
/// snapshot, matching spec §4.D's stated consistency model.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
    paths: Paths,
}

impl SessionRegistry {
    pub fn new(paths: Paths) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            paths,
        }
    }

    /// Loads the durable snapshot if present; a missing or corrupt snapshot
    /// starts the registry empty rather than failing startup — sessions
    /// re-announce themselves via fresh hook/status activity (spec §7:
    /// "restart should re-discover identities" is aspirational for hooks,
    /// but an empty registry is always a safe starting point).
    pub fn load(paths: Paths) -> Self {
        let sessions = match crate::fsutil::read_json_file::<HashMap<String, Session>>(
            &paths.sessions_snapshot(),
        ) {
            Ok(Some(sessions)) => sessions,
            Ok(None) => HashMap::new(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load session snapshot, starting empty");
                HashMap::new()
            }
        };
        Self {
            sessions: RwLock::new(sessions),
            paths,
        }
    }

    pub fn insert(&self, session: Session) {
        self.sessions.write().insert(session.session_id.clone(), session);
    }

    pub fn get(&self, session_id: &str) -> Result<Session> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))
    }

    /// Applies `mutate` to the session under the write lock and returns the
    /// updated record. The closure pattern keeps read-modify-write atomic
    /// without exposing the lock guard to callers.
    pub fn mutate<F>(&self, session_id: &str, mutate: F) -> Result<Session>
    where
        F: FnOnce(&mut Session),
    {
        let mut guard = self.sessions.write();
        let session = guard
            .get_mut(session_id)
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()))?;
        mutate(session);
        Ok(session.clone())
    }

    /// All sessions whose `status` is `Active` — the pool eligible for
    /// broadcast, mail default-recipients, and identity assignment.
    pub fn active_view(&self) -> Vec<Session> {
        self.sessions
            .read()
            .values()
            .filter(|s| s.status == SessionStatus::Active)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> Vec<Session> {
        self.sessions.read().values().cloned().collect()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().contains_key(session_id)
    }

    /// Writes the full map to `sessions.json`. Best-effort per spec §4.D
    /// ("crash recovery is not required"); callers log failures rather than
    /// propagating them into the RPC response path.
    pub fn snapshot(&self) -> Result<()> {
        let sessions = self.sessions.read();
        atomic_write_json(&self.paths.sessions_snapshot(), &*sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CreatedBy;

    fn sample(id: &str) -> Session {
        let mut session = Session::new(id.to_string(), "/tmp".to_string(), false, None, None, CreatedBy::User);
        session.status = SessionStatus::Active;
        session
    }

    #[test]
    fn active_view_excludes_terminal_sessions() {
        let registry = SessionRegistry::new(Paths::from_base(std::path::PathBuf::from("/tmp/unused")));
        registry.insert(sample("a"));
        let mut killed = sample("b");
        killed.status = SessionStatus::Killed;
        registry.insert(killed);

        let active = registry.active_view();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].session_id, "a");
    }

    #[test]
    fn mutate_is_read_modify_write() {
        let registry = SessionRegistry::new(Paths::from_base(std::path::PathBuf::from("/tmp/unused")));
        registry.insert(sample("a"));
        let updated = registry
            .mutate("a", |s| s.auto_continue_count += 1)
            .unwrap();
        assert_eq!(updated.auto_continue_count, 1);
        assert_eq!(registry.get("a").unwrap().auto_continue_count, 1);
    }

    #[test]
    fn mutate_unknown_session_is_not_found() {
        let registry = SessionRegistry::new(Paths::from_base(std::path::PathBuf::from("/tmp/unused")));
        let err = registry.mutate("missing", |_| {}).unwrap_err();
        assert!(matches!(err, CoreError::SessionNotFound(_)));
    }

    #[test]
    fn snapshot_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::from_base(dir.path().to_path_buf());
        let registry = SessionRegistry::new(paths.clone());
        registry.insert(sample("a"));
        registry.snapshot().unwrap();

        let reloaded = SessionRegistry::load(paths);
        assert!(reloaded.contains("a"));
    }
}

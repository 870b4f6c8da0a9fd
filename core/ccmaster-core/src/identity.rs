//! Identity Service (component I, spec §4, property 3, scenario S4).
//!
//! Identities aren't a separate store — they're the `identity` field
//! already carried on each `Session` record (spec §3). This module is the
//! bijection contract layered on top: at most one *active* session may
//! hold a given non-empty identity at a time (invariant (iii)).

use crate::error::{CoreError, Result};
use crate::registry::SessionRegistry;
use crate::session::SessionStatus;

/// Assigns `identity` to `session_id`. Fails with `IdentityTaken` if another
/// *active* session already holds it (scenario S4: killing the holder frees
/// the identity for reassignment). Re-assigning the same identity to the
/// session that already holds it is a no-op success.
pub fn set_identity(registry: &SessionRegistry, session_id: &str, identity: &str) -> Result<()> {
    for session in registry.all() {
        if session.session_id == session_id {
            continue;
        }
        if session.status == SessionStatus::Active && session.identity.as_deref() == Some(identity) {
            return Err(CoreError::IdentityTaken(identity.to_string()));
        }
    }

    registry.mutate(session_id, |s| s.identity = Some(identity.to_string()))?;
    Ok(())
}

/// Returns the `identity → session_id` mapping for every session that
/// currently has an identity set (spec property 3: `list_members` must
/// reflect the most recent successful `set_identity`). By default only
/// `Active` sessions are included, matching the original's
/// `list_team_members(include_inactive: bool = False)`; pass
/// `include_inactive = true` to also surface identities still bound to a
/// terminal session.
pub fn list_members(registry: &SessionRegistry, include_inactive: bool) -> Vec<(String, String)> {
    registry
        .all()
        .into_iter()
        .filter(|s| include_inactive || s.status == SessionStatus::Active)
        .filter_map(|s| s.identity.map(|identity| (identity, s.session_id)))
        .collect()
}

/// Resolves an identity to its session id, if bound to an active session.
pub fn resolve(registry: &SessionRegistry, identity: &str) -> Option<String> {
    registry
        .all()
        .into_iter()
        .find(|s| s.status == SessionStatus::Active && s.identity.as_deref() == Some(identity))
        .map(|s| s.session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Paths;
    use crate::session::{CreatedBy, Session};
    use std::path::PathBuf;

    fn registry_with(ids: &[&str]) -> SessionRegistry {
        let registry = SessionRegistry::new(Paths::from_base(PathBuf::from("/tmp/unused")));
        for id in ids {
            let mut session = Session::new(id.to_string(), "/tmp".to_string(), false, None, None, CreatedBy::User);
            session.status = SessionStatus::Active;
            registry.insert(session);
        }
        registry
    }

    #[test]
    fn scenario_s4_identity_bijection() {
        let registry = registry_with(&["s1", "s2"]);

        set_identity(&registry, "s1", "alpha").unwrap();

        let err = set_identity(&registry, "s2", "alpha").unwrap_err();
        assert!(matches!(err, CoreError::IdentityTaken(_)));

        registry.mutate("s1", |s| s.status = SessionStatus::Killed).unwrap();

        set_identity(&registry, "s2", "alpha").unwrap();
        assert_eq!(resolve(&registry, "alpha").as_deref(), Some("s2"));
    }

    #[test]
    fn list_members_reflects_current_bindings() {
        let registry = registry_with(&["s1"]);
        set_identity(&registry, "s1", "alpha").unwrap();
        let members = list_members(&registry, false);
        assert_eq!(members, vec![("alpha".to_string(), "s1".to_string())]);
    }

    #[test]
    fn list_members_excludes_inactive_sessions_by_default() {
        let registry = registry_with(&["s1"]);
        set_identity(&registry, "s1", "alpha").unwrap();
        registry.mutate("s1", |s| s.status = SessionStatus::Killed).unwrap();

        assert_eq!(list_members(&registry, false), Vec::<(String, String)>::new());
        assert_eq!(
            list_members(&registry, true),
            vec![("alpha".to_string(), "s1".to_string())]
        );
    }
}

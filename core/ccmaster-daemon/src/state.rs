//! Shared daemon state (spec §5: "the Registry is the only hot contended
//! structure").
//!
//! `AppState` is cloned into every axum handler and every per-session
//! monitor task; everything inside is already `Arc`-backed so the clone is
//! cheap and all mutation still funnels through `SessionRegistry`'s single
//! write lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use ccmaster_core::config::Paths;
use ccmaster_core::injector::Injector;
use ccmaster_core::launcher::Launcher;
use ccmaster_core::registry::SessionRegistry;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Clone)]
pub struct AppState {
    pub paths: Paths,
    pub registry: Arc<SessionRegistry>,
    pub launcher: Arc<dyn Launcher>,
    pub injector: Arc<dyn Injector>,
    pub started_at: Instant,
    /// One monitor task per Active session, so `kill`/`interrupt` can abort
    /// it immediately instead of waiting for the next terminal-status check
    /// (spec §5: "terminated when the session enters a terminal status").
    pub monitors: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    /// Keeps a test's `TempDir` alive for the lifetime of the `AppState`
    /// that was built from it; absent in production.
    #[cfg(test)]
    pub _temp_dir_guard: Option<Arc<tempfile::TempDir>>,
}

impl AppState {
    pub fn new(paths: Paths, launcher: Arc<dyn Launcher>, injector: Arc<dyn Injector>) -> Self {
        let registry = Arc::new(SessionRegistry::load(paths.clone()));
        Self {
            paths,
            registry,
            launcher,
            injector,
            started_at: Instant::now(),
            monitors: Arc::new(Mutex::new(HashMap::new())),
            #[cfg(test)]
            _temp_dir_guard: None,
        }
    }

    pub fn spawn_monitor(&self, session_id: String) {
        let state = self.clone();
        let handle = tokio::spawn(crate::hook_ingest::run_monitor(state, session_id.clone()));
        self.monitors.lock().insert(session_id, handle);
    }

    pub fn abort_monitor(&self, session_id: &str) {
        if let Some(handle) = self.monitors.lock().remove(session_id) {
            handle.abort();
        }
    }
}

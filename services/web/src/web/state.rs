//! services/web/src/web/state.rs
//!
//! Defines the application's shared state and the per-browser session registry.

use chrono::{DateTime, Duration, Utc};
use show_tell_core::domain::Session;
use show_tell_core::flow::PageFlow;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub flow: PageFlow,
    pub sessions: SessionRegistry,
    pub prompt_image_path: PathBuf,
}

impl AppState {
    pub fn new(flow: PageFlow, prompt_image_path: PathBuf, session_ttl: Duration) -> Self {
        Self {
            flow,
            sessions: SessionRegistry::new(session_ttl),
            prompt_image_path,
        }
    }
}

//=========================================================================================
// SessionRegistry (One Session per Browser)
//=========================================================================================

/// A handle to one browser's session. Requests for the same session are
/// processed one at a time.
pub type SessionHandle = Arc<tokio::sync::Mutex<Session>>;

struct Entry {
    handle: SessionHandle,
    expires_at: DateTime<Utc>,
}

/// Keeps live sessions in memory, keyed by the id stored in the cookie.
///
/// A session expires once it has been idle for the configured time to live.
/// Expired sessions are dropped on the next access to the registry.
pub struct SessionRegistry {
    ttl: Duration,
    sessions: Mutex<HashMap<Uuid, Entry>>,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the live session bound to `id`, if any. Never creates one.
    pub fn get(&self, id: Option<Uuid>) -> Option<SessionHandle> {
        let now = Utc::now();
        let mut sessions = self.live_sessions(now);
        let entry = sessions.get_mut(&id?)?;
        entry.expires_at = now + self.ttl;
        Some(entry.handle.clone())
    }

    /// Returns the session bound to `id`, or registers a fresh one.
    ///
    /// The boolean is `true` when a new session was created, in which case the
    /// caller must hand the returned id back to the browser.
    pub fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SessionHandle, bool) {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let mut sessions = self.live_sessions(now);

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                entry.expires_at = expires_at;
                return (id, entry.handle.clone(), false);
            }
        }

        let id = Uuid::new_v4();
        let handle = Arc::new(tokio::sync::Mutex::new(Session::new(id)));
        sessions.insert(
            id,
            Entry {
                handle: handle.clone(),
                expires_at,
            },
        );
        (id, handle, true)
    }

    /// The number of sessions that have not expired.
    pub fn live_count(&self) -> usize {
        self.live_sessions(Utc::now()).len()
    }

    /// Locks the map after dropping every entry that has expired by `now`.
    fn live_sessions(&self, now: DateTime<Utc>) -> MutexGuard<'_, HashMap<Uuid, Entry>> {
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        sessions.retain(|_, entry| entry.expires_at > now);
        sessions
    }
}

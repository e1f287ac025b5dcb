use serde::Serialize;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Identity of a logged-in user, handed to every interaction handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionContext {
    /// Login email
    pub email: String,

    /// Display name from the profile; records are attributed to this
    pub name: String,
}

struct Session {
    context: SessionContext,
    expires_at: SystemTime,
}

/// Active sessions, owned by the application state
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    lifetime: Duration,
}

impl SessionStore {
    pub fn new(lifetime: Duration) -> Self {
        SessionStore {
            sessions: RwLock::new(HashMap::new()),
            lifetime,
        }
    }

    /// Start a session and return its id (a random UUID).
    pub fn create(&self, context: SessionContext) -> String {
        let session_id = Uuid::new_v4().to_string();
        let session = Session {
            context,
            expires_at: SystemTime::now() + self.lifetime,
        };

        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        // Drop anything stale while holding the write lock anyway.
        let now = SystemTime::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(session_id.clone(), session);

        session_id
    }

    /// Context for a live session, `None` if unknown or expired.
    pub fn get(&self, session_id: &str) -> Option<SessionContext> {
        let sessions = self.sessions.read().unwrap_or_else(|e| e.into_inner());
        sessions
            .get(session_id)
            .filter(|s| s.expires_at > SystemTime::now())
            .map(|s| s.context.clone())
    }

    pub fn remove(&self, session_id: &str) -> Option<SessionContext> {
        let mut sessions = self.sessions.write().unwrap_or_else(|e| e.into_inner());
        sessions.remove(session_id).map(|s| s.context)
    }
}

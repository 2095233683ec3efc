use super::session::Session;
use crate::relay::ModelName;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

/// One lock per user session. A streaming turn holds it for the whole reply.
pub type SessionHandle = Arc<Mutex<Session>>;

/// All live user sessions (session_id → session)
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session and return its id
    pub async fn create(&self, model: ModelName) -> String {
        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        let session = Session::new(session_id.clone(), model);

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id.clone(), Arc::new(Mutex::new(session)));

        info!("Created session {} ({} live)", session_id, sessions.len());
        session_id
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions.get(session_id).cloned()
    }

    /// End a session. Returns whether it existed.
    pub async fn end(&self, session_id: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(session_id).is_some()
        };
        if removed {
            info!("Ended session {}", session_id);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop sessions idle for longer than `max_idle`.
    ///
    /// Sessions whose lock is held (a turn is streaming) are never evicted.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let max_idle = chrono::Duration::from_std(max_idle)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|session_id, handle| match handle.try_lock() {
            Ok(session) => {
                let keep = now.signed_duration_since(session.last_active) <= max_idle;
                if !keep {
                    info!("Evicting idle session {}", session_id);
                }
                keep
            }
            Err(_) => true,
        });

        before - sessions.len()
    }
}

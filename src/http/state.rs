use crate::credentials::Credentials;
use crate::relay::{ModelName, Relay};
use crate::session::SessionStore;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Live user sessions (session_id → session)
    pub sessions: SessionStore,

    /// Provider adapters
    pub relay: Relay,

    /// Keys used when a session has not supplied its own
    pub fallback_credentials: Credentials,

    /// Model new sessions start with
    pub default_model: ModelName,
}

impl AppState {
    pub fn new(relay: Relay, fallback_credentials: Credentials, default_model: ModelName) -> Self {
        Self {
            sessions: SessionStore::new(),
            relay,
            fallback_credentials,
            default_model,
        }
    }
}

use super::chat::Chat;
use crate::credentials::Credentials;
use crate::relay::ModelName;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Ephemeral state for one user's interaction with the application.
///
/// Every handler receives the session explicitly; nothing here is global.
/// Chat CRUD lives in the registry (`create`, `delete`, `select`,
/// `append_turn`).
#[derive(Debug, Clone)]
pub struct Session {
    /// Unique session identifier (e.g., "session-7f0c...")
    id: String,

    /// Chats keyed by id, in creation order
    pub(super) chats: IndexMap<String, Chat>,

    /// Weak reference into `chats`; cleared when the chat goes away
    pub(super) active_chat_id: Option<String>,

    /// Prompt waiting to be submitted (typed or transcribed)
    pub draft_prompt: String,

    /// Whether the voice recorder is open
    pub recording: bool,

    /// Whether a transcript was submitted as the current draft
    pub audio_submitted: bool,

    /// Model used for the next turn
    pub model: ModelName,

    /// User-supplied keys (fallbacks come from configuration)
    pub credentials: Credentials,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// Last time a handler touched the session
    pub last_active: DateTime<Utc>,
}

impl Session {
    pub fn new(id: String, model: ModelName) -> Self {
        let now = Utc::now();
        Self {
            id,
            chats: IndexMap::new(),
            active_chat_id: None,
            draft_prompt: String::new(),
            recording: false,
            audio_submitted: false,
            model,
            credentials: Credentials::default(),
            created_at: now,
            last_active: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Chats in creation order
    pub fn chats(&self) -> impl Iterator<Item = &Chat> {
        self.chats.values()
    }

    pub fn chat(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.get(chat_id)
    }

    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    /// The active chat id, only if it still names a chat
    pub fn active_chat_id(&self) -> Option<&str> {
        self.active_chat_id
            .as_deref()
            .filter(|id| self.chats.contains_key(*id))
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.active_chat_id().and_then(|id| self.chats.get(id))
    }

    /// Record that a handler ran
    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

use super::chat::DisplayEntry;
use super::session::Session;
use crate::credentials::CredentialPresence;
use crate::relay::ModelName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const GREETING_SWAHILI: &str = "Jambo! Nikusaidieje leo? 🙂";
pub const GREETING_ENGLISH: &str = "Hello! How can I help you today? 🙂";

/// Everything the UI shell needs to draw one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,

    pub greeting: Greeting,

    /// Sidebar entries in creation order
    pub chats: Vec<ChatSummary>,

    /// The active chat's transcript, if any chat is active
    pub active_chat: Option<ActiveChatView>,

    pub draft_prompt: String,
    pub recording: bool,
    pub audio_submitted: bool,
    pub model: ModelName,

    /// Which user-supplied keys are set (the keys themselves are never rendered)
    pub credentials: CredentialPresence,

    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Greeting {
    pub swahili: String,
    pub english: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: String,
    pub title: String,
    pub active: bool,
    pub turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveChatView {
    pub id: String,
    pub title: String,
    pub transcript: Vec<DisplayEntry>,
}

/// Render a session. A stale active id renders as "no active chat".
pub fn render(session: &Session) -> SessionView {
    let active_id = session.active_chat_id();

    let chats = session
        .chats()
        .map(|chat| ChatSummary {
            id: chat.id.clone(),
            title: chat.title.clone(),
            active: Some(chat.id.as_str()) == active_id,
            turns: chat.display().len(),
        })
        .collect();

    let active_chat = session.active_chat().map(|chat| ActiveChatView {
        id: chat.id.clone(),
        title: chat.title.clone(),
        transcript: chat.display().to_vec(),
    });

    SessionView {
        session_id: session.id().to_string(),
        greeting: Greeting {
            swahili: GREETING_SWAHILI.to_string(),
            english: GREETING_ENGLISH.to_string(),
        },
        chats,
        active_chat,
        draft_prompt: session.draft_prompt.clone(),
        recording: session.recording,
        audio_submitted: session.audio_submitted,
        model: session.model,
        credentials: session.credentials.presence(),
        created_at: session.created_at,
    }
}

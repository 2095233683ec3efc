//! Chat CRUD over a session's chat mapping

use super::chat::{Chat, DisplayContent, Role};
use super::session::Session;
use crate::error::{ChatError, Result};
use tracing::{debug, info};

impl Session {
    /// Create a chat with `title` and make it active. Always succeeds.
    pub fn create(&mut self, title: impl Into<String>) -> String {
        let chat_id = format!("chat-{}", uuid::Uuid::new_v4());
        let title = title.into();

        info!("Session {}: creating chat {} ({:?})", self.id(), chat_id, title);

        self.chats
            .insert(chat_id.clone(), Chat::new(chat_id.clone(), title));
        self.active_chat_id = Some(chat_id.clone());
        chat_id
    }

    /// Remove a chat. Unknown ids are a no-op. Clears the active pointer if it
    /// pointed at the removed chat.
    pub fn delete(&mut self, chat_id: &str) {
        if self.chats.shift_remove(chat_id).is_none() {
            debug!("Session {}: chat {} already gone", self.id(), chat_id);
            return;
        }

        info!("Session {}: deleted chat {}", self.id(), chat_id);

        if self.active_chat_id.as_deref() == Some(chat_id) {
            self.active_chat_id = None;
        }
    }

    /// Make `chat_id` the active chat.
    ///
    /// A stale or unknown id is not an error: the session is left with no
    /// active chat, so the next prompt starts a new one. Returns whether the
    /// chat exists.
    pub fn select(&mut self, chat_id: &str) -> bool {
        if !self.chats.contains_key(chat_id) {
            debug!("Session {}: chat {} not found, clearing selection", self.id(), chat_id);
            self.active_chat_id = None;
            return false;
        }

        debug!("Session {}: selected chat {}", self.id(), chat_id);
        self.active_chat_id = Some(chat_id.to_string());
        true
    }

    /// Start over without an active chat; the next prompt creates one
    pub fn clear_active(&mut self) {
        self.active_chat_id = None;
    }

    /// Append one turn to both the model history and the display history
    pub fn append_turn(
        &mut self,
        chat_id: &str,
        role: Role,
        model_content: impl Into<String>,
        display_content: DisplayContent,
    ) -> Result<()> {
        let chat = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| ChatError::chat_not_found(chat_id))?;

        chat.push_turn(role, model_content.into(), display_content);
        Ok(())
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Titles longer than this many characters are truncated
pub const TITLE_MAX_CHARS: usize = 20;

/// Appended to truncated titles
pub const TITLE_ELLIPSIS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A model-facing turn, sent back to the provider as history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// What the user sees for one turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayContent {
    /// User turns, shown verbatim
    Text(String),
    /// Assistant turns, shown in Swahili and English tabs
    Bilingual { swahili: String, english: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayEntry {
    pub role: Role,
    pub content: DisplayContent,
}

/// One conversation thread.
///
/// `messages` and `display` always have the same length; both only grow.
#[derive(Debug, Clone, Serialize)]
pub struct Chat {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    messages: Vec<ChatMessage>,
    display: Vec<DisplayEntry>,
}

impl Chat {
    pub fn new(id: String, title: String) -> Self {
        Self {
            id,
            title,
            created_at: Utc::now(),
            messages: Vec::new(),
            display: Vec::new(),
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn display(&self) -> &[DisplayEntry] {
        &self.display
    }

    pub(crate) fn push_turn(&mut self, role: Role, model_content: String, display: DisplayContent) {
        self.messages.push(ChatMessage {
            role,
            content: model_content,
        });
        self.display.push(DisplayEntry {
            role,
            content: display,
        });
    }
}

/// Derive a sidebar title from the first prompt of a chat
pub fn derive_title(prompt: &str) -> String {
    if prompt.chars().count() <= TITLE_MAX_CHARS {
        return prompt.to_string();
    }
    let mut title: String = prompt.chars().take(TITLE_MAX_CHARS).collect();
    title.push_str(TITLE_ELLIPSIS);
    title
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_title_is_unchanged() {
        assert_eq!(derive_title("Habari"), "Habari");
        assert_eq!(derive_title(""), "");
    }

    #[test]
    fn test_title_at_limit_is_unchanged() {
        let prompt = "a".repeat(TITLE_MAX_CHARS);
        assert_eq!(derive_title(&prompt), prompt);
    }

    #[test]
    fn test_long_title_is_truncated_with_ellipsis() {
        let title = derive_title("Nataka kujua hali ya hewa ya leo Nairobi");
        assert_eq!(title, "Nataka kujua hali ya...");
        assert_eq!(title.chars().count(), TITLE_MAX_CHARS + TITLE_ELLIPSIS.len());
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let prompt = "ü".repeat(TITLE_MAX_CHARS + 5);
        let title = derive_title(&prompt);
        assert_eq!(title, format!("{}...", "ü".repeat(TITLE_MAX_CHARS)));
    }

    #[test]
    fn test_display_content_serializes_both_languages() {
        let entry = DisplayEntry {
            role: Role::Assistant,
            content: DisplayContent::Bilingual {
                swahili: "Nzuri".to_string(),
                english: "Good".to_string(),
            },
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"]["swahili"], "Nzuri");
        assert_eq!(json["content"]["english"], "Good");
    }
}

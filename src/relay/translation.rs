use super::{ensure_success, Translator};
use crate::config::TranslationConfig;
use crate::error::{ChatError, Result};
use serde_json::Value;
use tracing::debug;

/// MyMemory translation API (`GET /get?q=...&langpair=sw|en`)
pub struct MyMemoryTranslator {
    http: reqwest::Client,
    base_url: String,
    langpair: String,
    email: Option<String>,
    max_query_chars: usize,
}

impl MyMemoryTranslator {
    pub fn new(http: reqwest::Client, config: &TranslationConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            langpair: format!("{}|{}", config.source_lang, config.target_lang),
            email: config.email.clone(),
            max_query_chars: config.max_query_chars.max(1),
        }
    }

    async fn translate_chunk(&self, chunk: &str) -> Result<String> {
        let mut query = vec![("q", chunk), ("langpair", self.langpair.as_str())];
        if let Some(email) = &self.email {
            query.push(("de", email.as_str()));
        }

        let response = self
            .http
            .get(format!("{}/get", self.base_url))
            .query(&query)
            .send()
            .await
            .map_err(|e| ChatError::Provider(format!("Request failed: {}", e)))?;
        let response = ensure_success(response).await?;

        let body: Value = response.json().await.map_err(|e| {
            ChatError::Provider(format!("Failed to parse translation response: {}", e))
        })?;

        parse_translation(&body)
    }
}

#[async_trait::async_trait]
impl Translator for MyMemoryTranslator {
    async fn translate(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }

        let chunks = chunk_text(text, self.max_query_chars);
        debug!("Translating {} chars in {} request(s)", text.len(), chunks.len());

        let mut translated = Vec::with_capacity(chunks.len());
        for chunk in &chunks {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            translated.push(self.translate_chunk(chunk).await?);
        }

        Ok(translated.join(" "))
    }
}

/// `responseStatus` comes back as a number or a string depending on the error
fn parse_translation(body: &Value) -> Result<String> {
    let status_ok = match &body["responseStatus"] {
        Value::Number(n) => n.as_u64() == Some(200),
        Value::String(s) => s == "200",
        _ => true,
    };
    if !status_ok {
        let details = body["responseDetails"]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or("translation failed");
        return Err(ChatError::Provider(details.to_string()));
    }

    body["responseData"]["translatedText"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| ChatError::Provider("Translation response missing translatedText".to_string()))
}

/// Split `text` into pieces of at most `max_chars` characters, breaking after
/// whitespace where possible. Concatenating the pieces gives back `text`.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_inclusive(char::is_whitespace) {
        let word_len = word.chars().count();

        if current_len + word_len > max_chars && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if word_len > max_chars {
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_short_text_is_one_chunk() {
        assert_eq!(chunk_text("Habari yako", 500), vec!["Habari yako"]);
    }

    #[test]
    fn test_chunks_respect_limit_and_reassemble() {
        let text = "Jambo rafiki yangu, leo ni siku nzuri sana kwa kutembea.";
        let chunks = chunk_text(text, 12);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_overlong_word_is_hard_split() {
        let chunks = chunk_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_parses_translated_text() {
        let body = json!({
            "responseData": { "translatedText": "Good" },
            "responseStatus": 200,
            "responseDetails": ""
        });
        assert_eq!(parse_translation(&body).unwrap(), "Good");
    }

    #[test]
    fn test_string_error_status_is_provider_error() {
        let body = json!({
            "responseData": { "translatedText": "" },
            "responseStatus": "403",
            "responseDetails": "'AUTO' IS AN INVALID SOURCE LANGUAGE"
        });
        assert_eq!(
            parse_translation(&body).unwrap_err(),
            ChatError::Provider("'AUTO' IS AN INVALID SOURCE LANGUAGE".to_string())
        );
    }
}

//! Adapters over the remote providers
//!
//! - Chat completion (streamed): OpenAI and Anthropic, picked per model
//! - Speech-to-text: OpenAI transcriptions
//! - Translation (Swahili → English): MyMemory
//!
//! Nothing here retries; every failure goes straight back to the caller.

mod anthropic;
mod models;
mod openai;
mod translation;

pub use anthropic::AnthropicClient;
pub use models::{ModelName, Provider};
pub use openai::OpenAiClient;
pub use translation::MyMemoryTranslator;

use crate::config::ProvidersConfig;
use crate::error::{ChatError, Result};
use crate::session::ChatMessage;
use futures::stream::BoxStream;
use reqwest::Response;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Fixed instruction sent ahead of every conversation
pub const SYSTEM_INSTRUCTION: &str = "You are a helpful Swahili assistant that expects a prompt in Swahili and answers in Swahili. If you get a prompt in English or any other language that is not Swahili, you should still respond in Swahili";

/// Reply text fragments in arrival order. Finite; a retry needs a new request.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// One streamed completion call
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: ModelName,
    pub api_key: String,
    pub system: String,
    pub messages: Vec<ChatMessage>,
}

/// A recorded voice message
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    pub filename: String,
}

#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Open a streaming completion; fragments arrive on the returned stream
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream>;
}

#[async_trait::async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, api_key: &str, clip: AudioClip) -> Result<String>;
}

#[async_trait::async_trait]
pub trait Translator: Send + Sync {
    /// Translate Swahili text to English
    async fn translate(&self, text: &str) -> Result<String>;
}

/// Routes each request to the right provider
#[derive(Clone)]
pub struct Relay {
    openai: Arc<dyn CompletionProvider>,
    anthropic: Arc<dyn CompletionProvider>,
    transcriber: Arc<dyn Transcriber>,
    translator: Arc<dyn Translator>,
}

impl Relay {
    pub fn new(
        openai: Arc<dyn CompletionProvider>,
        anthropic: Arc<dyn CompletionProvider>,
        transcriber: Arc<dyn Transcriber>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            openai,
            anthropic,
            transcriber,
            translator,
        }
    }

    /// Build the real HTTP-backed providers
    pub fn from_config(config: &ProvidersConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        let openai = Arc::new(OpenAiClient::new(http.clone(), &config.openai));
        let anthropic = Arc::new(AnthropicClient::new(http.clone(), &config.anthropic));
        let translator = Arc::new(MyMemoryTranslator::new(http, &config.translation));

        Ok(Self::new(openai.clone(), anthropic, openai, translator))
    }

    /// Stream a reply to `history` (which must end with the new user turn)
    pub async fn stream_reply(
        &self,
        model: ModelName,
        api_key: String,
        history: &[ChatMessage],
    ) -> Result<FragmentStream> {
        if history.is_empty() {
            return Err(ChatError::EmptyInput("Please provide a prompt.".to_string()));
        }

        let provider = model.provider();
        info!(
            "Requesting {} completion from {} ({} messages)",
            model,
            provider,
            history.len()
        );

        let request = CompletionRequest {
            model,
            api_key,
            system: SYSTEM_INSTRUCTION.to_string(),
            messages: history.to_vec(),
        };

        let result = match provider {
            Provider::OpenAi => self.openai.stream(request).await,
            Provider::Anthropic => self.anthropic.stream(request).await,
        };
        if let Err(e) = &result {
            error!("{} completion failed: {}", provider, e);
        }
        result
    }

    pub async fn translate(&self, text: &str) -> Result<String> {
        self.translator.translate(text).await.map_err(|e| {
            error!("Translation failed: {}", e);
            e
        })
    }

    pub async fn transcribe(&self, api_key: &str, clip: AudioClip) -> Result<String> {
        if clip.bytes.is_empty() {
            return Err(ChatError::EmptyInput("Recorded audio is empty".to_string()));
        }

        info!("Transcribing {} ({} bytes)", clip.filename, clip.bytes.len());
        self.transcriber
            .transcribe(api_key, clip)
            .await
            .map_err(|e| {
                error!("Transcription failed: {}", e);
                e
            })
    }
}

/// Pass 2xx responses through; turn anything else into a provider error
/// carrying the provider's own message when it sent one.
pub(crate) async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|json| extract_api_error_message(&json))
        .unwrap_or_else(|| format!("API returned error: {} - {}", status, body));

    Err(ChatError::Provider(message))
}

pub(crate) fn extract_api_error_message(json: &Value) -> Option<String> {
    let error = json.get("error").filter(|error| !error.is_null())?;
    if let Some(message) = error.get("message").and_then(|value| value.as_str()) {
        return Some(message.to_string());
    }
    if let Some(message) = error.as_str() {
        return Some(message.to_string());
    }
    Some("An error occurred during streaming".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_error_message_from_object_shape() {
        let json = serde_json::json!({ "error": { "message": "Rate limit reached" } });
        assert_eq!(
            extract_api_error_message(&json).as_deref(),
            Some("Rate limit reached")
        );
    }

    #[test]
    fn test_extracts_error_message_from_string_shape() {
        let json = serde_json::json!({ "error": "bad key" });
        assert_eq!(extract_api_error_message(&json).as_deref(), Some("bad key"));
    }

    #[test]
    fn test_no_error_field_means_no_message() {
        let json = serde_json::json!({ "object": "chat.completion.chunk" });
        assert!(extract_api_error_message(&json).is_none());
    }

    #[test]
    fn test_null_error_field_means_no_message() {
        let json = serde_json::json!({ "error": null, "choices": [] });
        assert!(extract_api_error_message(&json).is_none());
    }
}

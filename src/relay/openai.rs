use super::{
    ensure_success, extract_api_error_message, AudioClip, CompletionProvider, CompletionRequest,
    FragmentStream, Transcriber,
};
use crate::config::OpenAiConfig;
use crate::error::{ChatError, Result};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, trace};

/// OpenAI chat completions (streamed) and audio transcriptions
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    transcription_model: String,
}

impl OpenAiClient {
    pub fn new(http: reqwest::Client, config: &OpenAiConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            transcription_model: config.transcription_model.clone(),
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiClient {
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        let mut messages = vec![json!({ "role": "system", "content": request.system })];
        messages.extend(request.messages.iter().map(|message| json!(message)));

        let payload = json!({
            "model": request.model.as_str(),
            "messages": messages,
            "stream": true,
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&request.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChatError::Provider(format!("Request failed: {}", e)))?;
        let response = ensure_success(response).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(handle_openai_stream(response, tx));

        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[async_trait::async_trait]
impl Transcriber for OpenAiClient {
    async fn transcribe(&self, api_key: &str, clip: AudioClip) -> Result<String> {
        let file = Part::bytes(clip.bytes).file_name(clip.filename);
        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .part("file", file);

        let response = self
            .http
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::Provider(format!("Request failed: {}", e)))?;
        let response = ensure_success(response).await?;

        let body: TranscriptionResponse = response.json().await.map_err(|e| {
            ChatError::Provider(format!("Failed to parse transcription response: {}", e))
        })?;

        Ok(body.text)
    }
}

#[derive(Debug, Deserialize)]
struct ChunkData {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    delta: Delta,
}

#[derive(Debug, Deserialize)]
struct Delta {
    content: Option<String>,
}

impl ChunkData {
    fn into_text(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|text| !text.is_empty())
    }
}

/// Read `data:` events until `[DONE]`, forwarding text deltas to `tx`
async fn handle_openai_stream(response: Response, tx: mpsc::UnboundedSender<Result<String>>) {
    let mut stream = response.bytes_stream().eventsource();

    while let Some(event) = stream.next().await {
        let sse = match event {
            Ok(sse) => sse,
            Err(e) => {
                let error_msg = format!("SSE stream error: {}", e);
                error!("{}", error_msg);
                let _ = tx.send(Err(ChatError::Provider(error_msg)));
                return;
            }
        };

        let raw = sse.data;
        trace!("OpenAI SSE: {:?}", raw);
        if raw == "[DONE]" {
            return;
        }

        match parse_chunk(&raw) {
            Ok(Some(text)) => {
                if tx.send(Ok(text)).is_err() {
                    debug!("Fragment receiver dropped; abandoning OpenAI stream");
                    return;
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!("{}", e);
                let _ = tx.send(Err(e));
                return;
            }
        }
    }

    let error_msg = "SSE stream closed before response completed";
    error!("{}", error_msg);
    let _ = tx.send(Err(ChatError::Provider(error_msg.to_string())));
}

fn parse_chunk(raw: &str) -> Result<Option<String>> {
    let event_json: Value = serde_json::from_str(raw)
        .map_err(|e| ChatError::Provider(format!("SSE parsing error: {}, data: {}", e, raw)))?;

    if let Some(message) = extract_api_error_message(&event_json) {
        return Err(ChatError::Provider(message));
    }

    let chunk: ChunkData = serde_json::from_value(event_json)
        .map_err(|e| ChatError::Provider(format!("SSE data schema error: {}, data: {}", e, raw)))?;

    Ok(chunk.into_text())
}

use super::{ensure_success, CompletionProvider, CompletionRequest, FragmentStream};
use crate::config::AnthropicConfig;
use crate::error::{ChatError, Result};
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Response;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, error, trace};

/// Anthropic Messages API, streamed
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    version: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn new(http: reqwest::Client, config: &AnthropicConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            version: config.version.clone(),
            max_tokens: config.max_tokens,
        }
    }
}

#[async_trait::async_trait]
impl CompletionProvider for AnthropicClient {
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        let payload = json!({
            "model": request.model.as_str(),
            "max_tokens": self.max_tokens,
            "system": request.system,
            "messages": request.messages,
            "stream": true,
        });

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &request.api_key)
            .header("anthropic-version", &self.version)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ChatError::Provider(format!("Request failed: {}", e)))?;
        let response = ensure_success(response).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(handle_anthropic_stream(response, tx));

        Ok(UnboundedReceiverStream::new(rx).boxed())
    }
}

#[derive(Debug, Deserialize)]
struct ContentBlockDelta {
    delta: DeltaBody,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DeltaBody {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct SseError {
    error: SseErrorBody,
}

#[derive(Debug, Deserialize)]
struct SseErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: String,
}

/// What one Anthropic SSE event means for the fragment stream
#[derive(Debug, PartialEq)]
enum Step {
    Text(String),
    Skip,
    Done,
}

fn interpret_event(event_type: &str, data: &str) -> Result<Step> {
    match event_type {
        "content_block_delta" => {
            let delta: ContentBlockDelta = serde_json::from_str(data).map_err(|e| {
                ChatError::Provider(format!("SSE parsing error: {}, data: {}", e, data))
            })?;
            match delta.delta {
                DeltaBody::TextDelta { text } if !text.is_empty() => Ok(Step::Text(text)),
                _ => Ok(Step::Skip),
            }
        }
        "message_stop" => Ok(Step::Done),
        "error" => {
            let sse_error: SseError = serde_json::from_str(data).map_err(|e| {
                ChatError::Provider(format!("SSE parsing error: {}, data: {}", e, data))
            })?;
            let message = match sse_error.error.kind {
                Some(kind) => format!("{}: {}", kind, sse_error.error.message),
                None => sse_error.error.message,
            };
            Err(ChatError::Provider(message))
        }
        // message_start, content_block_start/stop, message_delta, ping
        _ => Ok(Step::Skip),
    }
}

async fn handle_anthropic_stream(response: Response, tx: mpsc::UnboundedSender<Result<String>>) {
    let mut stream = response.bytes_stream().eventsource();

    while let Some(event) = stream.next().await {
        let sse = match event {
            Ok(sse) => sse,
            Err(e) => {
                let error_msg = format!("SSE Error: {}", e);
                error!("{}", error_msg);
                let _ = tx.send(Err(ChatError::Provider(error_msg)));
                return;
            }
        };

        trace!("Anthropic SSE: [{}] {}", sse.event, sse.data);

        match interpret_event(&sse.event, &sse.data) {
            Ok(Step::Text(text)) => {
                if tx.send(Ok(text)).is_err() {
                    debug!("Fragment receiver dropped; abandoning Anthropic stream");
                    return;
                }
            }
            Ok(Step::Skip) => {}
            Ok(Step::Done) => return,
            Err(e) => {
                error!("{}", e);
                let _ = tx.send(Err(e));
                return;
            }
        }
    }

    let error_msg = "SSE Error: stream closed before response completed";
    error!("{}", error_msg);
    let _ = tx.send(Err(ChatError::Provider(error_msg.to_string())));
}

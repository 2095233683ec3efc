use super::state::AppState;
use crate::credentials::Credentials;
use crate::error::ChatError;
use crate::relay::{ModelName, Provider};
use crate::session::{render, Session, SessionHandle, SessionView};
use crate::turn::{prepare_turn, run_turn, TurnEvent};
use crate::voice;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::{mpsc, OwnedMutexGuard};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

/// Events buffered between a running turn and the SSE response
const TURN_EVENT_BUFFER: usize = 64;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ModelRequest {
    pub model: ModelName,
}

#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    pub title: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct PromptRequest {
    /// Prompt to submit; the session's draft is used when absent
    pub prompt: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeRequest {
    /// Base64-encoded audio
    pub audio: String,

    /// Original file name; the extension tells the provider the format
    pub filename: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscribeResponse {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SubmitTranscriptRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: ModelName,
    pub provider: Provider,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Everything a handler can fail with
#[derive(Debug)]
pub enum ApiError {
    Chat(ChatError),
    SessionNotFound(String),
    SessionBusy(String),
}

impl From<ChatError> for ApiError {
    fn from(e: ChatError) -> Self {
        ApiError::Chat(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Chat(e) => {
                let status = match &e {
                    ChatError::Configuration(_) | ChatError::EmptyInput(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    ChatError::NotFound(_) => StatusCode::NOT_FOUND,
                    ChatError::Provider(_) => StatusCode::BAD_GATEWAY,
                };
                (status, e.to_string())
            }
            ApiError::SessionNotFound(id) => {
                (StatusCode::NOT_FOUND, format!("Session {} not found", id))
            }
            ApiError::SessionBusy(id) => (
                StatusCode::CONFLICT,
                format!("Session {} is still streaming a reply", id),
            ),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Lock a session for one handler. A turn in flight holds the lock, so a busy
/// session is reported instead of waited on.
async fn lock_session(
    state: &AppState,
    session_id: &str,
) -> ApiResult<OwnedMutexGuard<Session>> {
    let handle: SessionHandle = state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::SessionNotFound(session_id.to_string()))?;

    handle
        .try_lock_owned()
        .map_err(|_| ApiError::SessionBusy(session_id.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /models
/// Selectable models and their providers
pub async fn list_models() -> Json<Vec<ModelInfo>> {
    Json(
        ModelName::ALL
            .into_iter()
            .map(|name| ModelInfo {
                name,
                provider: name.provider(),
            })
            .collect(),
    )
}

/// POST /sessions
/// Start a new user session
pub async fn create_session(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let session_id = state.sessions.create(state.default_model).await;
    let session = lock_session(&state, &session_id).await?;
    Ok((StatusCode::CREATED, Json(render(&session))))
}

/// GET /sessions/:session_id
/// Render a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let session = lock_session(&state, &session_id).await?;
    Ok(Json(render(&session)))
}

/// DELETE /sessions/:session_id
/// End a session and drop all of its chats
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<StatusCode> {
    // Refuse while a reply is streaming
    drop(lock_session(&state, &session_id).await?);

    if state.sessions.end(&session_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(session_id))
    }
}

/// PUT /sessions/:session_id/credentials
/// Store user-supplied API keys for this session
pub async fn set_credentials(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<CredentialsRequest>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    session.credentials = Credentials::new(req.openai, req.anthropic)?;
    session.touch();

    info!("Session {}: API keys saved", session_id);
    Ok(Json(render(&session)))
}

/// PUT /sessions/:session_id/model
/// Choose the model for the next turns
pub async fn set_model(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<ModelRequest>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    session.model = req.model;
    session.touch();

    info!("Session {}: model set to {}", session_id, req.model);
    Ok(Json(render(&session)))
}

/// PUT /sessions/:session_id/draft
/// Replace the draft prompt
pub async fn set_draft(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<DraftRequest>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    session.draft_prompt = req.prompt;
    session.touch();
    Ok(Json(render(&session)))
}

/// POST /sessions/:session_id/chats
/// Create a chat with an explicit title and make it active
pub async fn create_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<CreateChatRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut session = lock_session(&state, &session_id).await?;
    session.create(req.title);
    session.touch();
    Ok((StatusCode::CREATED, Json(render(&session))))
}

/// POST /sessions/:session_id/chats/new
/// "New Chat": no chat is active until the next prompt creates one
pub async fn new_chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    session.clear_active();
    session.touch();
    Ok(Json(render(&session)))
}

/// POST /sessions/:session_id/chats/:chat_id/select
/// Switch the active chat. A stale id renders with no active chat.
pub async fn select_chat(
    State(state): State<AppState>,
    Path((session_id, chat_id)): Path<(String, String)>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    if !session.select(&chat_id) {
        warn!("Session {}: selected unknown chat {}", session_id, chat_id);
    }
    session.touch();
    Ok(Json(render(&session)))
}

/// DELETE /sessions/:session_id/chats/:chat_id
/// Delete a chat (unknown ids are ignored) and return the refreshed view
pub async fn delete_chat(
    State(state): State<AppState>,
    Path((session_id, chat_id)): Path<(String, String)>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    session.delete(&chat_id);
    session.touch();
    Ok(Json(render(&session)))
}

/// POST /sessions/:session_id/prompt
/// Submit a prompt and stream the turn back as server-sent events
pub async fn submit_prompt(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Option<Json<PromptRequest>>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let mut session = lock_session(&state, &session_id).await?;
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let turn = prepare_turn(&session, &state.fallback_credentials, req.prompt)?;

    info!(
        "Session {}: starting turn with {} ({} chars)",
        session_id,
        turn.model(),
        turn.prompt().len()
    );

    let (tx, rx) = mpsc::channel(TURN_EVENT_BUFFER);
    let relay = state.relay.clone();

    // The guard moves into the task: the session stays locked until the turn ends
    tokio::spawn(async move {
        if let Err(e) = run_turn(&mut session, &relay, turn, &tx).await {
            warn!("Session {}: turn ended with error: {}", session.id(), e);
        }
        // Unlock before the event stream closes
        drop(session);
        drop(tx);
    });

    let stream =
        ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(to_sse_event(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_sse_event(event: &TurnEvent) -> Event {
    Event::default()
        .event(event.name())
        .json_data(event)
        .unwrap_or_else(|e| {
            error!("Failed to encode turn event: {}", e);
            Event::default().event("failed").data(e.to_string())
        })
}

/// POST /sessions/:session_id/recording/start
/// Open the voice recorder
pub async fn start_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    voice::start_recording(&mut session, &state.fallback_credentials)?;
    Ok(Json(render(&session)))
}

/// POST /sessions/:session_id/recording/stop
/// Close the voice recorder (the "restart recording" button)
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    voice::stop_recording(&mut session);
    Ok(Json(render(&session)))
}

/// POST /sessions/:session_id/recording/transcribe
/// Transcribe a recorded clip for the user to review
pub async fn transcribe_recording(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<TranscribeRequest>,
) -> ApiResult<Json<TranscribeResponse>> {
    let mut session = lock_session(&state, &session_id).await?;
    let clip = voice::decode_clip(&req.audio, req.filename)?;

    let text =
        voice::transcribe(&mut session, &state.relay, &state.fallback_credentials, clip).await?;
    Ok(Json(TranscribeResponse { text }))
}

/// POST /sessions/:session_id/recording/submit
/// Use reviewed transcript text as the draft prompt
pub async fn submit_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(req): Json<SubmitTranscriptRequest>,
) -> ApiResult<Json<SessionView>> {
    let mut session = lock_session(&state, &session_id).await?;
    voice::submit_transcript(&mut session, &req.text)?;
    Ok(Json(render(&session)))
}

//! One user turn: prompt in, streamed Swahili reply plus English translation out
//!
//! State mutation happens here; presentation is left to whoever consumes the
//! `TurnEvent`s (the HTTP layer turns them into SSE).

use crate::credentials::Credentials;
use crate::error::{ChatError, Result};
use crate::relay::{ModelName, Relay};
use crate::session::{derive_title, DisplayContent, Role, Session};
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Progress of a turn, in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnEvent {
    /// No chat was active, so one was created for this prompt
    ChatCreated { chat_id: String, title: String },
    UserTurn { chat_id: String, content: String },
    Fragment { text: String },
    Translation { text: String },
    Completed { chat_id: String },
    Failed { error: String },
}

impl TurnEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TurnEvent::ChatCreated { .. } => "chat_created",
            TurnEvent::UserTurn { .. } => "user_turn",
            TurnEvent::Fragment { .. } => "fragment",
            TurnEvent::Translation { .. } => "translation",
            TurnEvent::Completed { .. } => "completed",
            TurnEvent::Failed { .. } => "failed",
        }
    }
}

/// A validated submission, ready to run
#[derive(Debug, Clone)]
pub struct PreparedTurn {
    prompt: String,
    model: ModelName,
    api_key: String,
}

impl PreparedTurn {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn model(&self) -> ModelName {
        self.model
    }
}

/// What a finished turn produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub chat_id: String,
    pub reply: String,
    pub translation: String,
}

/// Check a submission without touching the session.
///
/// `prompt` falls back to the session's draft.
pub fn prepare_turn(
    session: &Session,
    fallback: &Credentials,
    prompt: Option<String>,
) -> Result<PreparedTurn> {
    let prompt = prompt
        .unwrap_or_else(|| session.draft_prompt.clone())
        .trim()
        .to_string();
    if prompt.is_empty() {
        return Err(ChatError::EmptyInput("Please provide a prompt.".to_string()));
    }

    let model = session.model;
    let api_key = session.credentials.resolve(model.provider(), fallback)?;

    Ok(PreparedTurn {
        prompt,
        model,
        api_key,
    })
}

/// Run a prepared turn to completion.
///
/// On failure the session is restored to exactly what it was before the call.
/// Events are best-effort: a gone subscriber does not stop the turn.
pub async fn run_turn(
    session: &mut Session,
    relay: &Relay,
    turn: PreparedTurn,
    events: &mpsc::Sender<TurnEvent>,
) -> Result<TurnOutcome> {
    let snapshot = session.clone();
    session.touch();

    match execute(session, relay, turn, events).await {
        Ok(outcome) => {
            info!(
                "Session {}: turn completed in chat {} ({} chars)",
                session.id(),
                outcome.chat_id,
                outcome.reply.len()
            );
            emit(
                events,
                TurnEvent::Completed {
                    chat_id: outcome.chat_id.clone(),
                },
            )
            .await;
            Ok(outcome)
        }
        Err(e) => {
            warn!("Session {}: turn failed, restoring state: {}", session.id(), e);
            *session = snapshot;
            session.touch();
            emit(
                events,
                TurnEvent::Failed {
                    error: e.to_string(),
                },
            )
            .await;
            Err(e)
        }
    }
}

async fn execute(
    session: &mut Session,
    relay: &Relay,
    turn: PreparedTurn,
    events: &mpsc::Sender<TurnEvent>,
) -> Result<TurnOutcome> {
    let PreparedTurn {
        prompt,
        model,
        api_key,
    } = turn;

    let chat_id = match session.active_chat_id() {
        Some(id) => id.to_string(),
        None => {
            let title = derive_title(&prompt);
            let chat_id = session.create(title.clone());
            emit(
                events,
                TurnEvent::ChatCreated {
                    chat_id: chat_id.clone(),
                    title,
                },
            )
            .await;
            chat_id
        }
    };

    session.append_turn(
        &chat_id,
        Role::User,
        prompt.clone(),
        DisplayContent::Text(prompt.clone()),
    )?;
    emit(
        events,
        TurnEvent::UserTurn {
            chat_id: chat_id.clone(),
            content: prompt,
        },
    )
    .await;

    let history = session
        .chat(&chat_id)
        .map(|chat| chat.messages().to_vec())
        .ok_or_else(|| ChatError::chat_not_found(&chat_id))?;

    let mut fragments = relay.stream_reply(model, api_key, &history).await?;
    let mut reply = String::new();
    while let Some(fragment) = fragments.next().await {
        let text = fragment?;
        reply.push_str(&text);
        emit(events, TurnEvent::Fragment { text }).await;
    }

    let translation = relay.translate(&reply).await?;
    emit(
        events,
        TurnEvent::Translation {
            text: translation.clone(),
        },
    )
    .await;

    session.append_turn(
        &chat_id,
        Role::Assistant,
        reply.clone(),
        DisplayContent::Bilingual {
            swahili: reply.clone(),
            english: translation.clone(),
        },
    )?;

    session.draft_prompt.clear();
    session.audio_submitted = false;

    Ok(TurnOutcome {
        chat_id,
        reply,
        translation,
    })
}

async fn emit(events: &mpsc::Sender<TurnEvent>, event: TurnEvent) {
    // The subscriber may have disconnected; the turn still completes.
    let _ = events.send(event).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::{
        AudioClip, CompletionProvider, CompletionRequest, FragmentStream, Transcriber, Translator,
    };
    use std::sync::{Arc, Mutex};

    /// Replies with fixed fragments and remembers what it was sent
    struct ScriptedCompletion {
        fragments: Vec<Result<String>>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl ScriptedCompletion {
        fn new(fragments: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                fragments,
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait::async_trait]
    impl CompletionProvider for ScriptedCompletion {
        async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
            self.seen.lock().unwrap().push(request);
            Ok(futures::stream::iter(self.fragments.clone()).boxed())
        }
    }

    struct FixedTranslator(Result<String>);

    #[async_trait::async_trait]
    impl Translator for FixedTranslator {
        async fn translate(&self, _text: &str) -> Result<String> {
            self.0.clone()
        }
    }

    struct NoTranscriber;

    #[async_trait::async_trait]
    impl Transcriber for NoTranscriber {
        async fn transcribe(&self, _api_key: &str, _clip: AudioClip) -> Result<String> {
            Err(ChatError::Provider("unused".to_string()))
        }
    }

    fn relay(completion: Arc<ScriptedCompletion>, translation: Result<String>) -> Relay {
        Relay::new(
            completion.clone(),
            completion,
            Arc::new(NoTranscriber),
            Arc::new(FixedTranslator(translation)),
        )
    }

    fn fallback() -> Credentials {
        Credentials {
            openai: Some("sk-test".to_string()),
            anthropic: None,
        }
    }

    fn new_session() -> Session {
        Session::new("session-test".to_string(), ModelName::Gpt35Turbo)
    }

    async fn drain(mut rx: mpsc::Receiver<TurnEvent>) -> Vec<TurnEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    #[tokio::test]
    async fn test_first_prompt_creates_chat_and_pairs_languages() {
        let completion = ScriptedCompletion::new(vec![Ok("Nzu".into()), Ok("ri".into())]);
        let relay = relay(completion.clone(), Ok("Good".into()));
        let mut session = new_session();
        let (tx, rx) = mpsc::channel(32);

        let turn = prepare_turn(&session, &fallback(), Some("Habari".into())).unwrap();
        let outcome = run_turn(&mut session, &relay, turn, &tx).await.unwrap();

        assert_eq!(outcome.reply, "Nzuri");
        assert_eq!(outcome.translation, "Good");

        let chat = session.active_chat().unwrap();
        assert_eq!(chat.title, "Habari");
        assert_eq!(chat.messages().len(), 2);
        assert_eq!(chat.messages()[0].role, Role::User);
        assert_eq!(chat.messages()[0].content, "Habari");
        assert_eq!(chat.messages()[1].role, Role::Assistant);
        assert_eq!(chat.messages()[1].content, "Nzuri");
        assert_eq!(
            chat.display()[1].content,
            DisplayContent::Bilingual {
                swahili: "Nzuri".into(),
                english: "Good".into()
            }
        );

        // The provider saw the user turn as the whole history
        let seen = completion.seen.lock().unwrap();
        assert_eq!(seen[0].messages.len(), 1);
        assert_eq!(seen[0].messages[0].content, "Habari");
        assert_eq!(seen[0].api_key, "sk-test");
        drop(seen);

        let names: Vec<&str> = drain(rx).await.iter().map(TurnEvent::name).collect();
        assert_eq!(
            names,
            vec![
                "chat_created",
                "user_turn",
                "fragment",
                "fragment",
                "translation",
                "completed"
            ]
        );
    }

    #[tokio::test]
    async fn test_second_prompt_reuses_active_chat_with_full_history() {
        let completion = ScriptedCompletion::new(vec![Ok("Sawa".into())]);
        let relay = relay(completion.clone(), Ok("Okay".into()));
        let mut session = new_session();
        let (tx, _rx) = mpsc::channel(64);

        for prompt in ["Habari", "Asante"] {
            let turn = prepare_turn(&session, &fallback(), Some(prompt.into())).unwrap();
            run_turn(&mut session, &relay, turn, &tx).await.unwrap();
        }

        assert_eq!(session.chat_count(), 1);
        let chat = session.active_chat().unwrap();
        assert_eq!(chat.messages().len(), 4);
        assert_eq!(chat.display().len(), 4);
        assert_eq!(completion.seen.lock().unwrap()[1].messages.len(), 3);
    }

    #[tokio::test]
    async fn test_draft_is_used_and_cleared() {
        let completion = ScriptedCompletion::new(vec![Ok("Ndiyo".into())]);
        let relay = relay(completion, Ok("Yes".into()));
        let mut session = new_session();
        session.draft_prompt = "  Je, uko tayari?  ".to_string();
        session.audio_submitted = true;
        let (tx, _rx) = mpsc::channel(32);

        let turn = prepare_turn(&session, &fallback(), None).unwrap();
        assert_eq!(turn.prompt(), "Je, uko tayari?");
        run_turn(&mut session, &relay, turn, &tx).await.unwrap();

        assert!(session.draft_prompt.is_empty());
        assert!(!session.audio_submitted);
    }

    #[tokio::test]
    async fn test_provider_failure_restores_session() {
        let completion = ScriptedCompletion::new(vec![
            Ok("Nz".into()),
            Err(ChatError::Provider("Rate limit reached".into())),
        ]);
        let relay = relay(completion, Ok("unused".into()));
        let mut session = new_session();
        session.draft_prompt = "Habari".to_string();
        let (tx, rx) = mpsc::channel(32);

        let turn = prepare_turn(&session, &fallback(), None).unwrap();
        let err = run_turn(&mut session, &relay, turn, &tx).await.unwrap_err();

        assert_eq!(err, ChatError::Provider("Rate limit reached".into()));
        assert_eq!(session.chat_count(), 0);
        assert!(session.active_chat_id().is_none());
        assert_eq!(session.draft_prompt, "Habari");

        let events = drain(rx).await;
        assert!(matches!(events.last(), Some(TurnEvent::Failed { .. })));
    }

    #[tokio::test]
    async fn test_translation_failure_keeps_existing_chat_untouched() {
        let completion = ScriptedCompletion::new(vec![Ok("Nzuri".into())]);
        let relay = relay(completion, Err(ChatError::Provider("quota".into())));
        let mut session = new_session();
        let chat_id = session.create("Existing");
        let (tx, _rx) = mpsc::channel(32);

        let turn = prepare_turn(&session, &fallback(), Some("Habari".into())).unwrap();
        assert!(run_turn(&mut session, &relay, turn, &tx).await.is_err());

        let chat = session.chat(&chat_id).unwrap();
        assert!(chat.messages().is_empty());
        assert!(chat.display().is_empty());
        assert_eq!(session.active_chat_id(), Some(chat_id.as_str()));
    }

    #[test]
    fn test_blank_prompt_is_empty_input() {
        let session = new_session();
        let err = prepare_turn(&session, &fallback(), Some("   ".into())).unwrap_err();
        assert!(matches!(err, ChatError::EmptyInput(_)));
    }

    #[test]
    fn test_missing_key_for_selected_provider_is_configuration_error() {
        let mut session = new_session();
        session.model = ModelName::Claude3Haiku;
        let err = prepare_turn(&session, &fallback(), Some("Habari".into())).unwrap_err();
        assert_eq!(err, ChatError::missing_api_key());
    }

    #[tokio::test]
    async fn test_stale_active_chat_starts_a_new_chat() {
        let completion = ScriptedCompletion::new(vec![Ok("Nzuri".into())]);
        let relay = relay(completion, Ok("Good".into()));
        let mut session = new_session();
        let old = session.create("Old");
        session.select("chat-gone");
        let (tx, _rx) = mpsc::channel(32);

        let turn = prepare_turn(&session, &fallback(), Some("Habari".into())).unwrap();
        let outcome = run_turn(&mut session, &relay, turn, &tx).await.unwrap();

        assert_ne!(outcome.chat_id, old);
        assert_eq!(session.chat_count(), 2);
    }
}

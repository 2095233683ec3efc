//! Voice input: open the recorder, transcribe a clip, submit the text as the draft

use crate::credentials::Credentials;
use crate::error::{ChatError, Result};
use crate::relay::{AudioClip, Provider, Relay};
use crate::session::Session;
use base64::Engine;
use tracing::info;

/// Name given to clips uploaded without one
pub const DEFAULT_CLIP_NAME: &str = "recording.wav";

/// Open the recorder. Transcription needs a key, so check it up front.
pub fn start_recording(session: &mut Session, fallback: &Credentials) -> Result<()> {
    session.credentials.resolve(Provider::OpenAi, fallback)?;

    info!("Session {}: recording started", session.id());
    session.recording = true;
    session.touch();
    Ok(())
}

/// Close the recorder without submitting anything
pub fn stop_recording(session: &mut Session) {
    info!("Session {}: recording stopped", session.id());
    session.recording = false;
    session.touch();
}

/// Decode a base64 clip from the UI
pub fn decode_clip(encoded: &str, filename: Option<String>) -> Result<AudioClip> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ChatError::EmptyInput(format!("Recorded audio is not valid base64: {}", e)))?;
    if bytes.is_empty() {
        return Err(ChatError::EmptyInput("Recorded audio is empty".to_string()));
    }

    Ok(AudioClip {
        bytes,
        filename: filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CLIP_NAME.to_string()),
    })
}

/// Transcribe a clip for review while the recorder is open.
///
/// Only the activity timestamp changes; the text becomes the draft once the
/// user submits it.
pub async fn transcribe(
    session: &mut Session,
    relay: &Relay,
    fallback: &Credentials,
    clip: AudioClip,
) -> Result<String> {
    if !session.recording {
        return Err(ChatError::EmptyInput(
            "Start a recording before submitting audio.".to_string(),
        ));
    }
    let api_key = session.credentials.resolve(Provider::OpenAi, fallback)?;

    session.touch();
    info!(
        "Session {}: transcribing {} ({} bytes)",
        session.id(),
        clip.filename,
        clip.bytes.len()
    );
    relay.transcribe(&api_key, clip).await
}

/// Accept reviewed transcript text as the next prompt
pub fn submit_transcript(session: &mut Session, text: &str) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ChatError::EmptyInput("Transcribed text is empty".to_string()));
    }

    info!("Session {}: transcript submitted as draft", session.id());
    session.draft_prompt = text.to_string();
    session.audio_submitted = true;
    session.recording = false;
    session.touch();
    Ok(())
}

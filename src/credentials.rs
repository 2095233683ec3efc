use crate::error::{ChatError, Result};
use crate::relay::Provider;
use serde::{Deserialize, Serialize};

/// Longest key accepted from the user
pub const MAX_API_KEY_LEN: usize = 200;

/// API keys for the model providers.
///
/// The OpenAI key doubles as the speech scope key (transcription). Translation
/// needs no key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
}

impl Credentials {
    /// Build user-supplied credentials, rejecting keys that cannot be valid.
    /// Blank keys are treated as absent.
    pub fn new(openai: Option<String>, anthropic: Option<String>) -> Result<Self> {
        Ok(Self {
            openai: normalize_key(openai)?,
            anthropic: normalize_key(anthropic)?,
        })
    }

    pub fn key_for(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::OpenAi => self.openai.as_deref(),
            Provider::Anthropic => self.anthropic.as_deref(),
        }
    }

    /// Resolve a key for `provider`, preferring ours over `fallback`
    pub fn resolve(&self, provider: Provider, fallback: &Credentials) -> Result<String> {
        self.key_for(provider)
            .or_else(|| fallback.key_for(provider))
            .map(str::to_string)
            .ok_or_else(ChatError::missing_api_key)
    }

    /// Which keys are present, for rendering. Never exposes the keys.
    pub fn presence(&self) -> CredentialPresence {
        CredentialPresence {
            openai: self.openai.is_some(),
            anthropic: self.anthropic.is_some(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPresence {
    pub openai: bool,
    pub anthropic: bool,
}

fn normalize_key(key: Option<String>) -> Result<Option<String>> {
    let Some(key) = key else {
        return Ok(None);
    };
    let key = key.trim();
    if key.is_empty() {
        return Ok(None);
    }
    if key.chars().count() > MAX_API_KEY_LEN {
        return Err(ChatError::Configuration(format!(
            "API key is longer than {} characters",
            MAX_API_KEY_LEN
        )));
    }
    Ok(Some(key.to_string()))
}

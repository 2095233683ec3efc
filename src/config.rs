use crate::credentials::Credentials;
use crate::relay::ModelName;
use anyhow::{Context, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub session: SessionSettings,
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Model new sessions start with
    #[serde(default)]
    pub default_model: ModelName,

    /// Sessions untouched for this long are dropped
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    /// How often to look for idle sessions
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_model: ModelName::default(),
            idle_timeout_secs: default_idle_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    pub openai: OpenAiConfig,
    pub anthropic: AnthropicConfig,
    pub translation: TranslationConfig,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiConfig {
    pub base_url: String,
    /// Fallback key; users may supply their own per session
    #[serde(default)]
    pub api_key: Option<String>,
    pub transcription_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnthropicConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    pub version: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    pub base_url: String,
    pub source_lang: String,
    pub target_lang: String,
    /// Optional contact address; MyMemory grants a larger quota with one
    #[serde(default)]
    pub email: Option<String>,
    /// MyMemory rejects longer queries
    #[serde(default = "default_max_query_chars")]
    pub max_query_chars: usize,
}

fn default_max_query_chars() -> usize {
    500
}

impl Config {
    /// Load `path` (any format the `config` crate knows), then `JAMBO__*`
    /// environment overrides, then the standard provider key variables.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("JAMBO").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        let mut cfg: Config = settings.try_deserialize()?;
        cfg.apply_env_keys(
            std::env::var("OPENAI_API_KEY").ok(),
            std::env::var("ANTHROPIC_API_KEY").ok(),
        );
        Ok(cfg)
    }

    /// Parse a TOML document without touching the environment
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Fill keys missing from the file with the given environment values
    pub fn apply_env_keys(&mut self, openai: Option<String>, anthropic: Option<String>) {
        let providers = &mut self.providers;
        if providers.openai.api_key.is_none() {
            providers.openai.api_key = openai;
        }
        if providers.anthropic.api_key.is_none() {
            providers.anthropic.api_key = anthropic;
        }
    }

    /// Keys used when a session has not supplied its own
    pub fn fallback_credentials(&self) -> Result<Credentials> {
        Credentials::new(
            self.providers.openai.api_key.clone(),
            self.providers.anthropic.api_key.clone(),
        )
        .context("Invalid API key in configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[service]
name = "jambo-chat"

[service.http]
bind = "127.0.0.1"
port = 8080

[providers.openai]
base_url = "https://api.openai.com/v1"
transcription_model = "whisper-1"

[providers.anthropic]
base_url = "https://api.anthropic.com/v1"
version = "2023-06-01"
max_tokens = 1024

[providers.translation]
base_url = "https://api.mymemory.translated.net"
source_lang = "sw"
target_lang = "en"
"#;

    #[test]
    fn test_parses_sample_with_defaults() {
        let cfg = Config::from_toml_str(SAMPLE).unwrap();

        assert_eq!(cfg.service.http.port, 8080);
        assert_eq!(cfg.session.default_model, ModelName::Gpt35Turbo);
        assert_eq!(cfg.session.idle_timeout_secs, 3600);
        assert_eq!(cfg.providers.translation.max_query_chars, 500);
        assert!(cfg.providers.openai.api_key.is_none());
    }

    #[test]
    fn test_env_keys_fill_only_missing_values() {
        let mut cfg = Config::from_toml_str(SAMPLE).unwrap();
        cfg.providers.anthropic.api_key = Some("ant-file".to_string());

        cfg.apply_env_keys(Some("sk-env".to_string()), Some("ant-env".to_string()));

        let creds = cfg.fallback_credentials().unwrap();
        assert_eq!(creds.openai.as_deref(), Some("sk-env"));
        assert_eq!(creds.anthropic.as_deref(), Some("ant-file"));
    }

    #[test]
    fn test_session_model_can_be_overridden() {
        let toml = format!("{}\n[session]\ndefault_model = \"claude-3-haiku-20240307\"\n", SAMPLE);
        let cfg = Config::from_toml_str(&toml).unwrap();
        assert_eq!(cfg.session.default_model, ModelName::Claude3Haiku);
        assert_eq!(cfg.session.sweep_interval_secs, 60);
    }
}

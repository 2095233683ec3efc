use crate::error::ChatError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Remote completion service behind a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::OpenAi => write!(f, "OpenAI"),
            Provider::Anthropic => write!(f, "Anthropic"),
        }
    }
}

/// Selectable chat models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ModelName {
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-4-turbo")]
    Gpt4Turbo,
    #[serde(rename = "gpt-4o")]
    Gpt4o,
    #[serde(rename = "claude-3-5-sonnet-latest")]
    Claude35Sonnet,
    #[serde(rename = "claude-3-haiku-20240307")]
    Claude3Haiku,
}

impl ModelName {
    pub const ALL: [ModelName; 6] = [
        ModelName::Gpt35Turbo,
        ModelName::Gpt4,
        ModelName::Gpt4Turbo,
        ModelName::Gpt4o,
        ModelName::Claude35Sonnet,
        ModelName::Claude3Haiku,
    ];

    /// Identifier sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelName::Gpt35Turbo => "gpt-3.5-turbo",
            ModelName::Gpt4 => "gpt-4",
            ModelName::Gpt4Turbo => "gpt-4-turbo",
            ModelName::Gpt4o => "gpt-4o",
            ModelName::Claude35Sonnet => "claude-3-5-sonnet-latest",
            ModelName::Claude3Haiku => "claude-3-haiku-20240307",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ModelName::Gpt35Turbo | ModelName::Gpt4 | ModelName::Gpt4Turbo | ModelName::Gpt4o => {
                Provider::OpenAi
            }
            ModelName::Claude35Sonnet | ModelName::Claude3Haiku => Provider::Anthropic,
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelName::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| ChatError::Configuration(format!("Unknown model: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_table_covers_both_providers() {
        let openai = ModelName::ALL
            .iter()
            .filter(|m| m.provider() == Provider::OpenAi)
            .count();
        let anthropic = ModelName::ALL
            .iter()
            .filter(|m| m.provider() == Provider::Anthropic)
            .count();
        assert_eq!(openai, 4);
        assert_eq!(anthropic, 2);
    }

    #[test]
    fn test_serde_names_match_wire_names() {
        for model in ModelName::ALL {
            let json = serde_json::to_string(&model).unwrap();
            assert_eq!(json, format!("\"{}\"", model.as_str()));
            assert_eq!(model.as_str().parse::<ModelName>().unwrap(), model);
        }
    }

    #[test]
    fn test_unknown_model_is_configuration_error() {
        let err = "gpt-2".parse::<ModelName>().unwrap_err();
        assert!(matches!(err, ChatError::Configuration(_)));
    }

    #[test]
    fn test_default_model_is_gpt_35_turbo() {
        assert_eq!(ModelName::default().as_str(), "gpt-3.5-turbo");
    }
}

//! `provider/model` strings
//!
//! Agents name their model as `anthropic/claude-...`, `openai/gpt-...` or
//! `ollama/<name>`. A bare name without a slash is treated as Anthropic.
//! Ollama is reached through its OpenAI-compatible endpoint.

use crate::anthropic::{AnthropicConfig, AnthropicProvider};
use crate::error::{Error, Result};
use crate::openai::{OpenAiConfig, OpenAiProvider};
use crate::provider::SharedProvider;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

/// Model used when neither configuration nor environment names one
pub const DEFAULT_MODEL: &str = "anthropic/claude-sonnet-4-5-20250929";

/// Backend family of a model string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI chat completions
    OpenAi,
    /// Local Ollama over the OpenAI-compatible API
    Ollama,
}

impl ProviderKind {
    /// Prefix used in model strings
    #[must_use]
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
            Self::Ollama => "ollama",
        }
    }
}

/// A parsed `provider/model` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    /// Backend family
    pub provider: ProviderKind,
    /// Model name as the backend expects it
    pub model: String,
}

impl FromStr for ModelRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (prefix, model) = match s.split_once('/') {
            Some((prefix, model)) => (prefix, model),
            None => ("anthropic", s),
        };

        if model.is_empty() {
            return Err(Error::NotConfigured(format!("empty model name in '{}'", s)));
        }

        let provider = match prefix.to_ascii_lowercase().as_str() {
            "anthropic" => ProviderKind::Anthropic,
            "openai" => ProviderKind::OpenAi,
            "ollama" => ProviderKind::Ollama,
            other => {
                return Err(Error::NotConfigured(format!(
                    "unsupported model provider '{}'",
                    other
                )))
            }
        };

        Ok(Self {
            provider,
            model: model.to_string(),
        })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider.prefix(), self.model)
    }
}

/// Construct the provider serving a model, reading API keys from the environment
pub fn build_provider(model: &ModelRef) -> Result<SharedProvider> {
    debug!(model = %model, "building provider");
    let provider: SharedProvider = match model.provider {
        ProviderKind::Anthropic => Arc::new(AnthropicProvider::new(
            AnthropicConfig::from_env()?.with_model(&model.model),
        )?),
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(
            OpenAiConfig::from_env()?.with_model(&model.model),
        )?),
        ProviderKind::Ollama => Arc::new(OpenAiProvider::new(OpenAiConfig::ollama(&model.model))?),
    };
    Ok(provider)
}

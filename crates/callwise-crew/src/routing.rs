//! Model tier resolution
//!
//! Each tier resolves to a `provider/model` string: the `MODEL_LARGE` /
//! `MODEL_SMALL` environment variable wins, then the configured value, then
//! [`DEFAULT_MODEL`].

use crate::definition::ModelTier;
use crate::error::Result;
use callwise_llm::{build_provider, ModelRef, SharedProvider, DEFAULT_MODEL};
use tracing::info;

/// Model strings per tier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRouting {
    /// Model for [`ModelTier::Large`]
    pub large: String,
    /// Model for [`ModelTier::Small`]
    pub small: String,
}

impl ModelRouting {
    /// Resolve both tiers from configuration and an environment lookup
    pub fn resolve(
        large: Option<&str>,
        small: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let pick = |tier: ModelTier, configured: Option<&str>| {
            lookup(tier.env_var())
                .filter(|v| !v.trim().is_empty())
                .or_else(|| configured.map(str::to_string))
                .unwrap_or_else(|| DEFAULT_MODEL.to_string())
        };
        Self {
            large: pick(ModelTier::Large, large),
            small: pick(ModelTier::Small, small),
        }
    }

    /// Model string of a tier
    #[must_use]
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Large => &self.large,
            ModelTier::Small => &self.small,
        }
    }
}

/// A provider plus the model name it is asked for
#[derive(Clone)]
pub struct ModelBinding {
    /// Provider serving the model
    pub provider: SharedProvider,
    /// Model name sent in requests
    pub model: String,
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}

/// Bound providers for both tiers
#[derive(Debug, Clone)]
pub struct Models {
    large: ModelBinding,
    small: ModelBinding,
}

impl Models {
    /// Build providers for a routing, sharing one when both tiers name the same model
    pub fn from_routing(routing: &ModelRouting) -> Result<Self> {
        let large = bind(&routing.large)?;
        let small = if routing.small == routing.large {
            large.clone()
        } else {
            bind(&routing.small)?
        };
        info!(
            large = %routing.large,
            small = %routing.small,
            "Model tiers resolved"
        );
        Ok(Self { large, small })
    }

    /// One provider and model for every tier
    #[must_use]
    pub fn uniform(provider: SharedProvider, model: impl Into<String>) -> Self {
        let binding = ModelBinding {
            provider,
            model: model.into(),
        };
        Self {
            large: binding.clone(),
            small: binding,
        }
    }

    /// Explicit bindings per tier
    #[must_use]
    pub fn new(large: ModelBinding, small: ModelBinding) -> Self {
        Self { large, small }
    }

    /// Binding of a tier
    #[must_use]
    pub fn for_tier(&self, tier: ModelTier) -> &ModelBinding {
        match tier {
            ModelTier::Large => &self.large,
            ModelTier::Small => &self.small,
        }
    }
}

fn bind(model: &str) -> Result<ModelBinding> {
    let model_ref: ModelRef = model.parse()?;
    Ok(ModelBinding {
        provider: build_provider(&model_ref)?,
        model: model_ref.model,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use callwise_llm::MockProvider;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_environment_overrides_configuration() {
        let routing = ModelRouting::resolve(
            Some("anthropic/claude-opus-4-1"),
            Some("openai/gpt-4o-mini"),
            env(&[("MODEL_SMALL", "ollama/qwen3:4b")]),
        );
        assert_eq!(routing.model_for(ModelTier::Large), "anthropic/claude-opus-4-1");
        assert_eq!(routing.model_for(ModelTier::Small), "ollama/qwen3:4b");
    }

    #[test]
    fn test_default_model_fallback() {
        let routing = ModelRouting::resolve(None, None, env(&[("MODEL_LARGE", "  ")]));
        assert_eq!(routing.large, DEFAULT_MODEL);
        assert_eq!(routing.small, DEFAULT_MODEL);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let routing = ModelRouting {
            large: "gemini/gemini-2.0".to_string(),
            small: "gemini/gemini-2.0".to_string(),
        };
        assert!(Models::from_routing(&routing).is_err());
    }

    #[test]
    fn test_ollama_needs_no_key() {
        let routing = ModelRouting {
            large: "ollama/qwen3:4b".to_string(),
            small: "ollama/llama3.2".to_string(),
        };
        let models = Models::from_routing(&routing).unwrap();
        assert_eq!(models.for_tier(ModelTier::Large).model, "qwen3:4b");
        assert_eq!(models.for_tier(ModelTier::Small).model, "llama3.2");
        assert_eq!(models.for_tier(ModelTier::Small).provider.name(), "ollama");
    }

    #[test]
    fn test_uniform_binding() {
        let models = Models::uniform(Arc::new(MockProvider::new()), "mock-model");
        assert_eq!(models.for_tier(ModelTier::Large).model, "mock-model");
        assert_eq!(models.for_tier(ModelTier::Small).provider.name(), "mock");
    }
}

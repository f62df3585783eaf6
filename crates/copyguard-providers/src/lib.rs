//! # CopyGuard Providers
//!
//! Remote service clients for CopyGuard.
//!
//! Completion, embedding and vision backends are all OpenAI-compatible APIs,
//! handled by a single `OpenAiCompatibleProvider`. `HashEmbedder` is the
//! offline embedder selected with `provider = "local"`.

pub mod local;
pub mod openai_compatible;
pub mod provider_registry;
pub mod vision;

use std::sync::Arc;

use copyguard_core::config::CopyGuardConfig;
use copyguard_core::error::{CopyGuardError, Result};
use copyguard_core::traits::{Completer, Embedder, TextExtractor};

pub use local::HashEmbedder;
pub use openai_compatible::{OpenAiCompatibleProvider, ServiceSettings};
pub use vision::VisionExtractor;

fn build_provider(settings: &ServiceSettings, embedding: bool) -> Result<OpenAiCompatibleProvider> {
    match settings.provider.as_str() {
        // Custom endpoint: "custom:https://my-server.com/v1"
        other if other.starts_with("custom:") => {
            OpenAiCompatibleProvider::custom(other, settings)
        }
        name => {
            let registry = provider_registry::get_provider_config(name)
                .ok_or_else(|| {
                    CopyGuardError::ProviderNotFound(format!(
                        "{name} (known: {})",
                        available_providers().join(", ")
                    ))
                })?;
            OpenAiCompatibleProvider::from_registry(registry, settings, embedding)
        }
    }
}

/// Settings for the `[llm]` section.
pub fn llm_settings(config: &CopyGuardConfig) -> ServiceSettings {
    ServiceSettings {
        provider: config.llm.provider.clone(),
        model: config.llm.model.clone(),
        api_key: config.key_for(&config.llm.api_key).to_string(),
        endpoint: config.llm.endpoint.clone(),
        timeout: config.llm.timeout(),
    }
}

/// Settings for the `[embedding]` section.
pub fn embedding_settings(config: &CopyGuardConfig) -> ServiceSettings {
    ServiceSettings {
        provider: config.embedding.provider.clone(),
        model: config.embedding.model.clone(),
        api_key: config.key_for(&config.embedding.api_key).to_string(),
        endpoint: config.embedding.endpoint.clone(),
        timeout: config.embedding.timeout(),
    }
}

/// Settings for the `[vision]` section.
pub fn vision_settings(config: &CopyGuardConfig) -> ServiceSettings {
    ServiceSettings {
        provider: config.vision.provider.clone(),
        model: config.vision.model.clone(),
        api_key: config.key_for(&config.vision.api_key).to_string(),
        endpoint: config.vision.endpoint.clone(),
        timeout: config.vision.timeout(),
    }
}

/// Create the completion service from `[llm]`.
pub fn create_completer(config: &CopyGuardConfig) -> Result<Arc<dyn Completer>> {
    let provider = build_provider(&llm_settings(config), false)?;
    tracing::debug!(
        provider = Completer::name(&provider),
        model = provider.model(),
        base_url = provider.base_url(),
        "completer ready"
    );
    Ok(Arc::new(provider))
}

/// Create the embedding service from `[embedding]`.
pub fn create_embedder(config: &CopyGuardConfig) -> Result<Arc<dyn Embedder>> {
    if config.embedding.provider == "local" {
        return Ok(Arc::new(HashEmbedder::new(config.embedding.dimensions)));
    }
    let provider = build_provider(&embedding_settings(config), true)?;
    tracing::debug!(
        provider = Embedder::name(&provider),
        model = provider.model(),
        base_url = provider.base_url(),
        "embedder ready"
    );
    Ok(Arc::new(provider))
}

/// Create the image text extractor from `[vision]`, or `None` when disabled.
pub fn create_extractor(config: &CopyGuardConfig) -> Result<Option<Arc<dyn TextExtractor>>> {
    if !config.vision.enabled {
        return Ok(None);
    }
    let provider = build_provider(&vision_settings(config), false)?;
    tracing::debug!(model = provider.model(), base_url = provider.base_url(), "extractor ready");
    Ok(Some(Arc::new(VisionExtractor::new(
        provider,
        config.vision.max_tokens,
    ))))
}

/// List all available provider names.
pub fn available_providers() -> Vec<&'static str> {
    let mut names = provider_registry::all_provider_names();
    names.push("local");
    names.push("custom");
    names
}

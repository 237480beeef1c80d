//! Provider construction from configuration.

use bravomind_config::AppConfig;
use bravomind_core::error::ProviderError;
use bravomind_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;
use std::sync::Arc;
use std::time::Duration;

/// Build the configured generator.
///
/// The HTTP client timeout matches `generation.timeout_secs` so a hung
/// connection surfaces as [`ProviderError::Timeout`] even outside the turn
/// orchestrator's own deadline.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(format!(
            "No API key for provider '{}' (set BRAVOMIND_API_KEY or NVIDIA_API_KEY)",
            config.provider.name
        ))
    })?;

    let provider = OpenAiCompatProvider::with_timeout(
        config.provider.name.clone(),
        config.provider.api_url.clone(),
        api_key,
        Duration::from_secs(config.generation.timeout_secs),
    );

    Ok(Arc::new(provider))
}

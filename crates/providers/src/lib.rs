//! LLM provider implementations for Clerk.
//!
//! All providers implement the `clerk_core::Provider` trait.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;

use clerk_config::AppConfig;
use clerk_core::error::ProviderError;
use clerk_core::Provider;
use std::sync::Arc;

/// Build the configured completion provider.
///
/// Fails when no API key is available from the config file or environment.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        ProviderError::NotConfigured(
            "no API key configured; set OPENAI_API_KEY or api_key in clerk.toml".into(),
        )
    })?;

    Ok(Arc::new(OpenAiCompatProvider::new(
        "openai",
        &config.api_url,
        api_key,
    )))
}

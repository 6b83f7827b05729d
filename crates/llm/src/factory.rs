//! LLM provider factory.
//!
//! Creates LLM clients from the configured provider name.

use crate::client::LlmClient;
use crate::providers::{AnthropicClient, OllamaClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Connection settings for a provider client. Unset fields use the
/// provider's defaults.
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// API key, for providers that require one
    pub api_key: Option<String>,

    /// Anthropic `anthropic-version` header
    pub api_version: Option<String>,

    /// Per-request timeout in seconds (Ollama)
    pub timeout_secs: Option<u64>,
}

/// Create an LLM client based on the provider name.
///
/// A missing API key does not fail here. The server has to start without
/// one; the client reports `UpstreamUnavailable` when a query is made.
///
/// # Errors
/// Returns an error if the provider is unknown.
pub fn create_client(
    provider: &str,
    options: &ClientOptions,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    if provider_type.requires_api_key() && options.api_key.is_none() {
        tracing::warn!("No API key configured for {}; queries will fail", provider);
    }

    match provider_type {
        ProviderType::Anthropic => Ok(Arc::new(anthropic_client(options))),
        ProviderType::Ollama => Ok(Arc::new(ollama_client(options))),
    }
}

fn base_url(provider_type: ProviderType, options: &ClientOptions) -> &str {
    options
        .endpoint
        .as_deref()
        .unwrap_or(provider_type.default_endpoint())
}

fn anthropic_client(options: &ClientOptions) -> AnthropicClient {
    let client = AnthropicClient::with_base_url(
        base_url(ProviderType::Anthropic, options),
        options.api_key.clone(),
    );
    match &options.api_version {
        Some(version) => client.with_api_version(version),
        None => client,
    }
}

fn ollama_client(options: &ClientOptions) -> OllamaClient {
    let client = OllamaClient::with_base_url(base_url(ProviderType::Ollama, options));
    match options.timeout_secs {
        Some(secs) => client.with_timeout(Duration::from_secs(secs)),
        None => client,
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Factory - stored configuration to live adapter
//
// Decrypts the stored credential and instantiates the adapter for the
// configured vendor. Holds no per-call state.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::config::LlmConfig;
use crate::domain::llm::{LLMError, LLMProvider};
use crate::domain::provider::{CredentialCipher, ProviderConfig, ProviderKind};
use crate::infrastructure::llm::{AnthropicAdapter, OllamaAdapter, OpenAICompatibleAdapter};

/// Builds a vendor adapter for a stored provider configuration
pub trait AdapterFactory: Send + Sync {
    fn create_adapter(&self, config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>, FactoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum FactoryError {
    #[error("Unsupported vendor: {0}")]
    UnsupportedVendor(String),

    #[error("{0} provider requires an endpoint URL")]
    MissingEndpoint(ProviderKind),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Failed to initialise adapter: {0}")]
    Adapter(#[from] LLMError),
}

pub struct StandardProviderFactory {
    cipher: Arc<dyn CredentialCipher>,
    llm: LlmConfig,
}

impl StandardProviderFactory {
    pub fn new(cipher: Arc<dyn CredentialCipher>, llm: LlmConfig) -> Self {
        Self { cipher, llm }
    }

    fn decrypt_key(&self, config: &ProviderConfig) -> Result<Option<String>, FactoryError> {
        config
            .api_key_encrypted
            .as_deref()
            .map(|encrypted| {
                self.cipher
                    .decrypt_text(encrypted)
                    .map_err(|e| FactoryError::Credential(e.to_string()))
            })
            .transpose()
    }

    /// `timeout_secs` in the provider's config map wins over the defaults
    fn timeout_for(&self, config: &ProviderConfig, kind: ProviderKind) -> Duration {
        match config.config_u64("timeout_secs").filter(|secs| *secs > 0) {
            Some(secs) => Duration::from_secs(secs),
            None if kind.is_local() => self.llm.local_timeout(),
            None => self.llm.cloud_timeout(),
        }
    }
}

impl AdapterFactory for StandardProviderFactory {
    fn create_adapter(&self, config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>, FactoryError> {
        let kind = config.kind().map_err(FactoryError::UnsupportedVendor)?;
        let api_key = self.decrypt_key(config)?;
        let timeout = self.timeout_for(config, kind);
        let model = config
            .config_str("default_model")
            .unwrap_or(kind.fallback_model())
            .to_string();
        let endpoint = config
            .endpoint_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty());

        let adapter: Arc<dyn LLMProvider> = match kind {
            ProviderKind::OpenAI => Arc::new(OpenAICompatibleAdapter::new(
                kind.as_str(),
                endpoint.unwrap_or(&self.llm.openai_base_url),
                api_key,
                model,
                timeout,
            )?),
            ProviderKind::Anthropic => {
                let api_key = api_key
                    .ok_or_else(|| FactoryError::Credential("anthropic requires an API key".into()))?;
                Arc::new(AnthropicAdapter::new(
                    endpoint.unwrap_or(&self.llm.anthropic_base_url),
                    api_key,
                    model,
                    self.llm.default_max_tokens,
                    timeout,
                )?)
            }
            ProviderKind::Ollama => {
                let endpoint = endpoint.ok_or(FactoryError::MissingEndpoint(kind))?;
                if config.config_str("compatibility") == Some("openai") {
                    Arc::new(OpenAICompatibleAdapter::new(kind.as_str(), endpoint, api_key, model, timeout)?)
                } else {
                    Arc::new(OllamaAdapter::new(endpoint, model, timeout)?)
                }
            }
            ProviderKind::LMStudio => {
                let endpoint = endpoint.ok_or(FactoryError::MissingEndpoint(kind))?;
                Arc::new(OpenAICompatibleAdapter::new(kind.as_str(), endpoint, api_key, model, timeout)?)
            }
        };

        tracing::debug!(
            provider_id = %config.id,
            vendor = adapter.vendor(),
            timeout_secs = timeout.as_secs(),
            "Created provider adapter"
        );
        Ok(adapter)
    }
}

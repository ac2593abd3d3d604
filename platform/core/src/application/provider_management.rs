// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Provider Management - CRUD over a user's provider configs and model catalogue

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::application::provider_factory::{AdapterFactory, FactoryError};
use crate::domain::llm::LLMError;
use crate::domain::provider::{
    CipherError, CredentialCipher, ModelCapabilities, ModelDescriptor, ProviderConfig,
    ProviderConfigId, ProviderKind, UserId,
};
use crate::domain::repository::{ModelRepository, ProviderConfigRepository, RepositoryError};

#[derive(Debug, Clone, Default)]
pub struct NewProviderConfig {
    pub provider_type: String,
    pub name: String,
    /// Plaintext; encrypted before it is stored
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub is_default: bool,
    pub config: HashMap<String, Value>,
}

/// Partial update. `api_key: Some("")` clears the stored key.
#[derive(Debug, Clone, Default)]
pub struct ProviderConfigUpdate {
    pub name: Option<String>,
    pub api_key: Option<String>,
    pub endpoint_url: Option<String>,
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
    pub config: Option<HashMap<String, Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct NewModelDescriptor {
    pub model_id: String,
    pub display_name: Option<String>,
    pub capabilities: ModelCapabilities,
    pub input_price_per_1k: Option<f64>,
    pub output_price_per_1k: Option<f64>,
    pub max_context_tokens: Option<u32>,
    pub is_default: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider not found: {0}")]
    NotFound(ProviderConfigId),

    #[error("Model '{0}' is not registered for this provider")]
    ModelNotFound(String),

    #[error("Unsupported vendor: {0}")]
    UnsupportedVendor(String),

    #[error("{0} provider requires an endpoint URL")]
    MissingEndpoint(ProviderKind),

    #[error("{0} provider requires an API key")]
    MissingApiKey(ProviderKind),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Cipher(#[from] CipherError),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[async_trait]
pub trait ProviderManagementService: Send + Sync {
    async fn create_provider(&self, user_id: UserId, input: NewProviderConfig) -> Result<ProviderConfig, ProviderError>;
    async fn update_provider(
        &self,
        user_id: UserId,
        id: ProviderConfigId,
        update: ProviderConfigUpdate,
    ) -> Result<ProviderConfig, ProviderError>;
    async fn delete_provider(&self, user_id: UserId, id: ProviderConfigId) -> Result<(), ProviderError>;
    async fn list_providers(&self, user_id: UserId) -> Result<Vec<ProviderConfig>, ProviderError>;
    async fn set_default_provider(&self, user_id: UserId, id: ProviderConfigId) -> Result<ProviderConfig, ProviderError>;
    async fn test_connection(&self, user_id: UserId, id: ProviderConfigId) -> Result<bool, ProviderError>;
    async fn list_models(&self, user_id: UserId, id: ProviderConfigId) -> Result<Vec<ModelDescriptor>, ProviderError>;
    async fn sync_models(&self, user_id: UserId, id: ProviderConfigId) -> Result<Vec<ModelDescriptor>, ProviderError>;
    async fn register_model(
        &self,
        user_id: UserId,
        id: ProviderConfigId,
        input: NewModelDescriptor,
    ) -> Result<ModelDescriptor, ProviderError>;
    async fn set_default_model(
        &self,
        user_id: UserId,
        id: ProviderConfigId,
        model_id: &str,
    ) -> Result<ModelDescriptor, ProviderError>;
}

pub struct StandardProviderManagementService {
    providers: Arc<dyn ProviderConfigRepository>,
    models: Arc<dyn ModelRepository>,
    cipher: Arc<dyn CredentialCipher>,
    factory: Arc<dyn AdapterFactory>,
}

impl StandardProviderManagementService {
    pub fn new(
        providers: Arc<dyn ProviderConfigRepository>,
        models: Arc<dyn ModelRepository>,
        cipher: Arc<dyn CredentialCipher>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            providers,
            models,
            cipher,
            factory,
        }
    }

    async fn owned_provider(&self, user_id: UserId, id: ProviderConfigId) -> Result<ProviderConfig, ProviderError> {
        self.providers
            .find_by_id(id)
            .await?
            .filter(|config| config.is_owned_by(user_id))
            .ok_or(ProviderError::NotFound(id))
    }

    fn encrypt_key(&self, api_key: Option<&str>) -> Result<Option<String>, ProviderError> {
        match api_key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => Ok(Some(self.cipher.encrypt_text(key)?)),
            None => Ok(None),
        }
    }
}

fn normalized(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Vendor-specific requirements that must hold before a config is stored
fn check_requirements(config: &ProviderConfig) -> Result<(), ProviderError> {
    let kind = config.kind().map_err(ProviderError::UnsupportedVendor)?;
    if config.name.trim().is_empty() {
        return Err(ProviderError::InvalidInput("provider name must not be empty".into()));
    }
    if kind.is_local() && config.endpoint_url.is_none() {
        return Err(ProviderError::MissingEndpoint(kind));
    }
    if kind.requires_api_key() && config.api_key_encrypted.is_none() {
        return Err(ProviderError::MissingApiKey(kind));
    }
    Ok(())
}

#[async_trait]
impl ProviderManagementService for StandardProviderManagementService {
    async fn create_provider(&self, user_id: UserId, input: NewProviderConfig) -> Result<ProviderConfig, ProviderError> {
        let mut config = ProviderConfig::new(user_id, input.provider_type.trim().to_lowercase(), input.name.trim());
        config.api_key_encrypted = self.encrypt_key(input.api_key.as_deref())?;
        config.endpoint_url = normalized(input.endpoint_url);
        config.config = input.config;
        check_requirements(&config)?;

        // A user's first provider becomes the default
        config.is_default = input.is_default || self.providers.find_default_for_user(user_id).await?.is_none();

        self.providers.save(&config).await?;
        info!(
            provider_id = %config.id,
            provider_type = %config.provider_type,
            is_default = config.is_default,
            "Created AI provider"
        );
        Ok(config)
    }

    async fn update_provider(
        &self,
        user_id: UserId,
        id: ProviderConfigId,
        update: ProviderConfigUpdate,
    ) -> Result<ProviderConfig, ProviderError> {
        let mut config = self.owned_provider(user_id, id).await?;

        if let Some(name) = update.name {
            config.name = name.trim().to_string();
        }
        if let Some(api_key) = update.api_key {
            config.api_key_encrypted = self.encrypt_key(Some(&api_key))?;
        }
        if update.endpoint_url.is_some() {
            config.endpoint_url = normalized(update.endpoint_url);
        }
        if let Some(is_active) = update.is_active {
            config.is_active = is_active;
        }
        if let Some(is_default) = update.is_default {
            config.is_default = is_default;
        }
        if let Some(extra) = update.config {
            config.config = extra;
        }
        check_requirements(&config)?;

        config.touch();
        self.providers.save(&config).await?;
        info!(provider_id = %config.id, "Updated AI provider");
        Ok(config)
    }

    async fn delete_provider(&self, user_id: UserId, id: ProviderConfigId) -> Result<(), ProviderError> {
        let config = self.owned_provider(user_id, id).await?;
        self.providers.delete(config.id).await?;
        if config.is_default {
            warn!(provider_id = %config.id, "Deleted the default AI provider; user has no default until one is set");
        } else {
            info!(provider_id = %config.id, "Deleted AI provider");
        }
        Ok(())
    }

    async fn list_providers(&self, user_id: UserId) -> Result<Vec<ProviderConfig>, ProviderError> {
        Ok(self.providers.list_by_user(user_id).await?)
    }

    async fn set_default_provider(&self, user_id: UserId, id: ProviderConfigId) -> Result<ProviderConfig, ProviderError> {
        let mut config = self.owned_provider(user_id, id).await?;
        config.is_default = true;
        config.touch();
        self.providers.save(&config).await?;
        info!(provider_id = %config.id, "Set default AI provider");
        Ok(config)
    }

    async fn test_connection(&self, user_id: UserId, id: ProviderConfigId) -> Result<bool, ProviderError> {
        let config = self.owned_provider(user_id, id).await?;
        let adapter = self.factory.create_adapter(&config)?;
        let reachable = adapter.test_connection().await;
        info!(provider_id = %config.id, vendor = adapter.vendor(), reachable, "Tested provider connection");
        Ok(reachable)
    }

    async fn list_models(&self, user_id: UserId, id: ProviderConfigId) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let config = self.owned_provider(user_id, id).await?;
        Ok(self.models.list_models(config.id).await?)
    }

    /// Mirror the vendor's model list into the catalogue. Known entries keep
    /// their pricing; entries the vendor no longer reports are marked
    /// unavailable rather than deleted.
    async fn sync_models(&self, user_id: UserId, id: ProviderConfigId) -> Result<Vec<ModelDescriptor>, ProviderError> {
        let config = self.owned_provider(user_id, id).await?;
        let adapter = self.factory.create_adapter(&config)?;
        let reported = adapter.list_models().await?;

        let existing = self.models.list_models(config.id).await?;
        let mut has_default = existing.iter().any(|m| m.is_default && reported.contains(&m.model_id));

        for mut model in existing.iter().cloned() {
            let available = reported.contains(&model.model_id);
            if model.is_available != available {
                model.is_available = available;
                if !available {
                    model.is_default = false;
                }
                self.models.save_model(&model).await?;
            }
        }

        for name in &reported {
            if existing.iter().any(|m| &m.model_id == name) {
                continue;
            }
            let mut model = ModelDescriptor::new(config.id, name.clone());
            if !has_default {
                model.is_default = true;
                has_default = true;
            }
            self.models.save_model(&model).await?;
        }

        info!(provider_id = %config.id, reported = reported.len(), "Synchronised provider models");
        Ok(self.models.list_models(config.id).await?)
    }

    async fn register_model(
        &self,
        user_id: UserId,
        id: ProviderConfigId,
        input: NewModelDescriptor,
    ) -> Result<ModelDescriptor, ProviderError> {
        let config = self.owned_provider(user_id, id).await?;
        let model_id = input.model_id.trim();
        if model_id.is_empty() {
            return Err(ProviderError::InvalidInput("model id must not be empty".into()));
        }
        if [input.input_price_per_1k, input.output_price_per_1k]
            .iter()
            .flatten()
            .any(|price| *price < 0.0)
        {
            return Err(ProviderError::InvalidInput("prices must not be negative".into()));
        }

        let mut model = match self.models.find_model_by_name(config.id, model_id).await? {
            Some(existing) => existing,
            None => ModelDescriptor::new(config.id, model_id),
        };
        model.display_name = normalized(input.display_name).unwrap_or_else(|| model_id.to_string());
        model.capabilities = input.capabilities;
        model.input_price_per_1k = input.input_price_per_1k;
        model.output_price_per_1k = input.output_price_per_1k;
        model.max_context_tokens = input.max_context_tokens;
        model.is_available = true;
        model.is_default = input.is_default
            || model.is_default
            || self.models.find_default_model(config.id).await?.is_none();

        self.models.save_model(&model).await?;
        info!(provider_id = %config.id, model = %model.model_id, is_default = model.is_default, "Registered model");
        Ok(model)
    }

    async fn set_default_model(
        &self,
        user_id: UserId,
        id: ProviderConfigId,
        model_id: &str,
    ) -> Result<ModelDescriptor, ProviderError> {
        let config = self.owned_provider(user_id, id).await?;
        let mut model = self
            .models
            .find_model_by_name(config.id, model_id)
            .await?
            .ok_or_else(|| ProviderError::ModelNotFound(model_id.to_string()))?;
        model.is_default = true;
        self.models.save_model(&model).await?;
        Ok(model)
    }
}

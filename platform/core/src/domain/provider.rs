// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AI Provider Configuration
//!
//! Per-user provider configurations (credentials encrypted at rest) and the
//! model catalogue attached to each of them.
//!
//! Invariants, enforced by the repositories:
//! - at most one default [`ProviderConfig`] per user
//! - at most one default [`ModelDescriptor`] per provider

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderConfigId(pub Uuid);

impl ProviderConfigId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for ProviderConfigId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProviderConfigId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelId(pub Uuid);

impl ModelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ModelId {
    fn default() -> Self {
        Self::new()
    }
}

/// Supported vendors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Anthropic,
    Ollama,
    LMStudio,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Ollama => "ollama",
            ProviderKind::LMStudio => "lmstudio",
        }
    }

    /// Local vendors run on user infrastructure and need an endpoint
    pub fn is_local(&self) -> bool {
        matches!(self, ProviderKind::Ollama | ProviderKind::LMStudio)
    }

    pub fn requires_api_key(&self) -> bool {
        !self.is_local()
    }

    /// Model used when neither the request nor the provider names one
    pub fn fallback_model(&self) -> &'static str {
        match self {
            ProviderKind::OpenAI => "gpt-4o-mini",
            ProviderKind::Anthropic => "claude-3-5-sonnet-latest",
            ProviderKind::Ollama => "llama3.2",
            ProviderKind::LMStudio => "local-model",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAI),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "ollama" => Ok(ProviderKind::Ollama),
            "lmstudio" | "lm-studio" | "lm_studio" => Ok(ProviderKind::LMStudio),
            other => Err(other.to_string()),
        }
    }
}

/// Stored provider configuration owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: ProviderConfigId,
    pub user_id: UserId,

    /// Vendor kind as stored ("openai", "anthropic", "ollama", "lmstudio").
    /// Kept as text so that rows written by other tools surface as
    /// `UnsupportedVendor` at adapter creation instead of failing to load.
    pub provider_type: String,

    pub name: String,

    /// Encrypted API key; `None` for local vendors
    #[serde(skip_serializing)]
    pub api_key_encrypted: Option<String>,

    /// Base URL; required for local vendors
    pub endpoint_url: Option<String>,

    pub is_active: bool,
    pub is_default: bool,

    /// Free-form vendor options (e.g. `timeout_secs`, `compatibility`)
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProviderConfig {
    pub fn new(user_id: UserId, provider_type: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProviderConfigId::new(),
            user_id,
            provider_type: provider_type.into(),
            name: name.into(),
            api_key_encrypted: None,
            endpoint_url: None,
            is_active: true,
            is_default: false,
            config: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> Result<ProviderKind, String> {
        self.provider_type.parse()
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(|v| v.as_str())
    }

    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.as_u64())
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCapabilities {
    pub function_calling: bool,
    pub vision: bool,
    pub json_mode: bool,
}

/// Model available through a provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub id: ModelId,
    pub provider_id: ProviderConfigId,

    /// Vendor model identifier (e.g. "gpt-4o", "llama3.2")
    pub model_id: String,

    pub display_name: String,

    #[serde(default)]
    pub capabilities: ModelCapabilities,

    /// Price per 1,000 input tokens
    pub input_price_per_1k: Option<f64>,

    /// Price per 1,000 output tokens
    pub output_price_per_1k: Option<f64>,

    pub max_context_tokens: Option<u32>,
    pub is_available: bool,
    pub is_default: bool,
}

impl ModelDescriptor {
    pub fn new(provider_id: ProviderConfigId, model_id: impl Into<String>) -> Self {
        let model_id = model_id.into();
        Self {
            id: ModelId::new(),
            provider_id,
            display_name: model_id.clone(),
            model_id,
            capabilities: ModelCapabilities::default(),
            input_price_per_1k: None,
            output_price_per_1k: None,
            max_context_tokens: None,
            is_available: true,
            is_default: false,
        }
    }

    pub fn has_pricing(&self) -> bool {
        self.input_price_per_1k.is_some() || self.output_price_per_1k.is_some()
    }

    /// Cost of a call; `None` when no pricing is configured. A missing side
    /// of the price pair counts as free.
    pub fn cost_for(&self, prompt_tokens: u32, completion_tokens: u32) -> Option<f64> {
        if !self.has_pricing() {
            return None;
        }
        let input = self.input_price_per_1k.unwrap_or(0.0);
        let output = self.output_price_per_1k.unwrap_or(0.0);
        Some(
            (f64::from(prompt_tokens) / 1000.0) * input
                + (f64::from(completion_tokens) / 1000.0) * output,
        )
    }
}

/// Symmetric encryption boundary for stored credentials
pub trait CredentialCipher: Send + Sync {
    fn encrypt_text(&self, plaintext: &str) -> Result<String, CipherError>;
    fn decrypt_text(&self, ciphertext: &str) -> Result<String, CipherError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    #[error("Encryption failed: {0}")]
    Encrypt(String),

    #[error("Decryption failed: {0}")]
    Decrypt(String),

    #[error("Invalid key material: {0}")]
    Key(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_calculation() {
        let mut model = ModelDescriptor::new(ProviderConfigId::new(), "claude");
        model.input_price_per_1k = Some(0.003);
        model.output_price_per_1k = Some(0.015);

        let cost = model.cost_for(1000, 500).unwrap();
        assert!((cost - 0.0105).abs() < 1e-12);
    }

    #[test]
    fn test_cost_absent_without_pricing() {
        let model = ModelDescriptor::new(ProviderConfigId::new(), "llama3.2");
        assert_eq!(model.cost_for(1000, 1000), None);
    }

    #[test]
    fn test_cost_with_single_price() {
        let mut model = ModelDescriptor::new(ProviderConfigId::new(), "gpt-4o");
        model.input_price_per_1k = Some(0.01);
        assert_eq!(model.cost_for(2000, 5000), Some(0.02));
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("OpenAI".parse::<ProviderKind>(), Ok(ProviderKind::OpenAI));
        assert_eq!("lm-studio".parse::<ProviderKind>(), Ok(ProviderKind::LMStudio));
        assert_eq!("gemini".parse::<ProviderKind>(), Err("gemini".to_string()));
        assert!(ProviderKind::Ollama.is_local());
        assert!(!ProviderKind::Anthropic.is_local());
    }

    #[test]
    fn test_encrypted_key_is_not_serialized() {
        let mut config = ProviderConfig::new(UserId::new(), "openai", "work");
        config.api_key_encrypted = Some("secret".into());
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}

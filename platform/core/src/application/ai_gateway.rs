// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! AI Gateway
//!
//! Single entry point for chat completions. Resolves which of the caller's
//! providers serves the request, picks the model, delegates to the vendor
//! adapter and writes one usage record per adapter invocation.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::application::provider_factory::{AdapterFactory, FactoryError};
use crate::domain::llm::{ChatRequest, ChatResponse, ChatStream, LLMError};
use crate::domain::provider::{ModelDescriptor, ProviderConfig, ProviderConfigId, UserId};
use crate::domain::repository::{
    ModelRepository, ProviderConfigRepository, RepositoryError, UsageRepository,
};
use crate::domain::usage::{UsageRecord, UsageSummary};

/// Completion plus the provider that actually served it
#[derive(Debug, Clone)]
pub struct GatewayCompletion {
    pub provider_id: ProviderConfigId,
    pub response: ChatResponse,
}

#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// `provider_id` of `None` selects the caller's default provider
    async fn send_chat_completion(
        &self,
        user_id: UserId,
        request: ChatRequest,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<GatewayCompletion, GatewayError>;

    async fn stream_chat_completion(
        &self,
        user_id: UserId,
        request: ChatRequest,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<ChatStream, GatewayError>;
}

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Unknown id, or a provider owned by someone else
    #[error("Provider not found: {0}")]
    ProviderNotFound(ProviderConfigId),

    #[error("No default AI provider configured")]
    NoDefaultProvider,

    #[error("Provider {0} is inactive")]
    ProviderInactive(ProviderConfigId),

    #[error(transparent)]
    Factory(#[from] FactoryError),

    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub struct AIGatewayService {
    providers: Arc<dyn ProviderConfigRepository>,
    models: Arc<dyn ModelRepository>,
    usage: Arc<dyn UsageRepository>,
    factory: Arc<dyn AdapterFactory>,
}

impl AIGatewayService {
    pub fn new(
        providers: Arc<dyn ProviderConfigRepository>,
        models: Arc<dyn ModelRepository>,
        usage: Arc<dyn UsageRepository>,
        factory: Arc<dyn AdapterFactory>,
    ) -> Self {
        Self {
            providers,
            models,
            usage,
            factory,
        }
    }

    /// Explicit id must belong to the caller; otherwise the caller's default.
    /// Inactive providers are rejected either way.
    pub async fn resolve_provider(
        &self,
        user_id: UserId,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<ProviderConfig, GatewayError> {
        let config = match provider_id {
            Some(id) => self
                .providers
                .find_by_id(id)
                .await?
                .filter(|config| config.is_owned_by(user_id))
                .ok_or(GatewayError::ProviderNotFound(id))?,
            None => self
                .providers
                .find_default_for_user(user_id)
                .await?
                .ok_or(GatewayError::NoDefaultProvider)?,
        };

        if !config.is_active {
            return Err(GatewayError::ProviderInactive(config.id));
        }
        Ok(config)
    }

    pub async fn usage_summary(
        &self,
        user_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<UsageSummary, GatewayError> {
        Ok(self.usage.summarize(user_id, since).await?)
    }

    /// Request model, then the provider's default catalogue entry, then the
    /// adapter's built-in default
    fn choose_model(
        request: &ChatRequest,
        default_model: Option<&ModelDescriptor>,
        adapter_default: &str,
    ) -> String {
        request
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .or_else(|| default_model.map(|m| m.model_id.clone()))
            .unwrap_or_else(|| adapter_default.to_string())
    }

    async fn lookup_descriptor(
        &self,
        provider_id: ProviderConfigId,
        served_model: &str,
        requested_model: &str,
    ) -> Result<Option<ModelDescriptor>, RepositoryError> {
        if let Some(found) = self.models.find_model_by_name(provider_id, served_model).await? {
            return Ok(Some(found));
        }
        if served_model == requested_model {
            return Ok(None);
        }
        self.models.find_model_by_name(provider_id, requested_model).await
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl ChatGateway for AIGatewayService {
    async fn send_chat_completion(
        &self,
        user_id: UserId,
        request: ChatRequest,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<GatewayCompletion, GatewayError> {
        let config = self.resolve_provider(user_id, provider_id).await?;
        let default_model = self.models.find_default_model(config.id).await?;
        let adapter = self.factory.create_adapter(&config)?;
        let vendor = adapter.vendor();

        let model_name = Self::choose_model(&request, default_model.as_ref(), adapter.default_model());
        let request = request.with_model(model_name.clone());

        let started = Instant::now();
        let result = adapter.send_chat_completion(&request).await;
        let latency_ms = elapsed_ms(started);
        metrics::histogram!("edugen_ai_request_latency_ms", "vendor" => vendor).record(latency_ms as f64);

        match result {
            Ok(response) => {
                let descriptor = self
                    .lookup_descriptor(config.id, &response.model, &model_name)
                    .await?;
                let cost = descriptor.as_ref().and_then(|d| {
                    d.cost_for(response.usage.prompt_tokens, response.usage.completion_tokens)
                });

                let record = UsageRecord::success(
                    user_id,
                    config.id,
                    descriptor.as_ref().map(|d| d.id),
                    response.model.clone(),
                    response.usage,
                    latency_ms,
                    cost,
                );
                self.usage.append(&record).await?;

                metrics::counter!("edugen_ai_requests_total", "vendor" => vendor, "outcome" => "success")
                    .increment(1);
                info!(
                    provider_id = %config.id,
                    vendor,
                    model = %response.model,
                    total_tokens = response.usage.total_tokens,
                    latency_ms,
                    "Chat completion succeeded"
                );

                Ok(GatewayCompletion {
                    provider_id: config.id,
                    response,
                })
            }
            Err(err) => {
                let record = UsageRecord::failure(
                    user_id,
                    config.id,
                    default_model.as_ref().map(|d| d.id),
                    model_name.clone(),
                    latency_ms,
                    err.to_string(),
                );
                if let Err(log_err) = self.usage.append(&record).await {
                    warn!(provider_id = %config.id, error = %log_err, "Failed to record failed AI call");
                }

                metrics::counter!("edugen_ai_requests_total", "vendor" => vendor, "outcome" => "error")
                    .increment(1);
                warn!(
                    provider_id = %config.id,
                    vendor,
                    model = %model_name,
                    latency_ms,
                    error = %err,
                    "Chat completion failed"
                );

                Err(err.into())
            }
        }
    }

    async fn stream_chat_completion(
        &self,
        user_id: UserId,
        request: ChatRequest,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<ChatStream, GatewayError> {
        let config = self.resolve_provider(user_id, provider_id).await?;
        let default_model = self.models.find_default_model(config.id).await?;
        let adapter = self.factory.create_adapter(&config)?;

        let model_name = Self::choose_model(&request, default_model.as_ref(), adapter.default_model());
        let request = request.with_model(model_name.clone());

        let stream = adapter.stream_chat_completion(&request).await?;
        metrics::counter!("edugen_ai_requests_total", "vendor" => adapter.vendor(), "outcome" => "stream")
            .increment(1);
        info!(provider_id = %config.id, vendor = adapter.vendor(), model = %model_name, "Chat stream opened");
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::llm::{ChatMessage, FinishReason, LLMProvider, TokenUsage};
    use crate::infrastructure::repositories::{InMemoryProviderRepository, InMemoryUsageRepository};
    use futures::stream;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedProvider {
        fail: bool,
        seen_models: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl LLMProvider for ScriptedProvider {
        fn vendor(&self) -> &'static str {
            "openai"
        }

        fn default_model(&self) -> &str {
            "builtin-model"
        }

        async fn send_chat_completion(&self, request: &ChatRequest) -> Result<ChatResponse, LLMError> {
            let model = request.model_or("builtin-model").to_string();
            self.seen_models.lock().push(model.clone());
            if self.fail {
                return Err(LLMError::request_failed("openai", "HTTP 500: upstream exploded"));
            }
            Ok(ChatResponse {
                content: "hello".into(),
                model,
                usage: TokenUsage::new(1000, 500),
                finish_reason: FinishReason::Stop,
                latency_ms: 5,
            })
        }

        async fn stream_chat_completion(&self, _request: &ChatRequest) -> Result<ChatStream, LLMError> {
            Ok(Box::pin(stream::iter(vec![Ok("he".to_string()), Ok("llo".to_string())])))
        }

        async fn test_connection(&self) -> bool {
            true
        }

        async fn list_models(&self) -> Result<Vec<String>, LLMError> {
            Ok(vec!["builtin-model".into()])
        }
    }

    struct ScriptedFactory {
        fail: bool,
        calls: AtomicUsize,
        seen_models: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedFactory {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                calls: AtomicUsize::new(0),
                seen_models: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl AdapterFactory for ScriptedFactory {
        fn create_adapter(&self, _config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>, FactoryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(ScriptedProvider {
                fail: self.fail,
                seen_models: self.seen_models.clone(),
            }))
        }
    }

    struct Fixture {
        gateway: AIGatewayService,
        providers: Arc<InMemoryProviderRepository>,
        usage: Arc<InMemoryUsageRepository>,
        factory: Arc<ScriptedFactory>,
    }

    fn fixture(fail: bool) -> Fixture {
        let providers = Arc::new(InMemoryProviderRepository::new());
        let usage = Arc::new(InMemoryUsageRepository::new());
        let factory = Arc::new(ScriptedFactory::new(fail));
        let gateway = AIGatewayService::new(providers.clone(), providers.clone(), usage.clone(), factory.clone());
        Fixture {
            gateway,
            providers,
            usage,
            factory,
        }
    }

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("hi")])
    }

    async fn default_provider(providers: &InMemoryProviderRepository, user: UserId) -> ProviderConfig {
        let mut config = ProviderConfig::new(user, "openai", "primary");
        config.is_default = true;
        providers.save(&config).await.unwrap();
        config
    }

    #[tokio::test]
    async fn test_no_default_provider() {
        let fx = fixture(false);
        let err = fx.gateway.send_chat_completion(UserId::new(), request(), None).await.unwrap_err();
        assert!(matches!(err, GatewayError::NoDefaultProvider));
        assert_eq!(fx.factory.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_foreign_provider_is_not_found() {
        let fx = fixture(false);
        let owner = UserId::new();
        let config = default_provider(&fx.providers, owner).await;

        let err = fx
            .gateway
            .send_chat_completion(UserId::new(), request(), Some(config.id))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ProviderNotFound(id) if id == config.id));
        assert_eq!(fx.factory.calls.load(Ordering::SeqCst), 0);
        assert!(fx.usage.records().is_empty());
    }

    #[tokio::test]
    async fn test_inactive_provider_rejected() {
        let fx = fixture(false);
        let user = UserId::new();
        let mut config = default_provider(&fx.providers, user).await;
        config.is_active = false;
        fx.providers.save(&config).await.unwrap();

        let err = fx.gateway.send_chat_completion(user, request(), None).await.unwrap_err();
        assert!(matches!(err, GatewayError::ProviderInactive(_)));
    }

    #[tokio::test]
    async fn test_success_records_usage_with_cost() {
        let fx = fixture(false);
        let user = UserId::new();
        let config = default_provider(&fx.providers, user).await;

        let mut model = ModelDescriptor::new(config.id, "gpt-4o");
        model.input_price_per_1k = Some(0.005);
        model.output_price_per_1k = Some(0.011);
        model.is_default = true;
        fx.providers.save_model(&model).await.unwrap();

        let completion = fx.gateway.send_chat_completion(user, request(), None).await.unwrap();
        assert_eq!(completion.provider_id, config.id);
        assert_eq!(completion.response.model, "gpt-4o");

        let records = fx.usage.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].model_id, Some(model.id));
        assert_eq!(records[0].total_tokens, 1500);
        let cost = records[0].cost.unwrap();
        assert!((cost - 0.0105).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_model_fallback_order() {
        let fx = fixture(false);
        let user = UserId::new();
        let config = default_provider(&fx.providers, user).await;

        fx.gateway.send_chat_completion(user, request(), None).await.unwrap();

        let mut model = ModelDescriptor::new(config.id, "catalogue-default");
        model.is_default = true;
        fx.providers.save_model(&model).await.unwrap();
        fx.gateway.send_chat_completion(user, request(), None).await.unwrap();

        fx.gateway
            .send_chat_completion(user, request().with_model("explicit"), None)
            .await
            .unwrap();

        assert_eq!(
            *fx.factory.seen_models.lock(),
            vec!["builtin-model", "catalogue-default", "explicit"]
        );
    }

    #[tokio::test]
    async fn test_failure_records_error_usage() {
        let fx = fixture(true);
        let user = UserId::new();
        default_provider(&fx.providers, user).await;

        let err = fx.gateway.send_chat_completion(user, request(), None).await.unwrap_err();
        assert!(matches!(err, GatewayError::Llm(LLMError::ProviderRequestFailed { .. })));

        let records = fx.usage.records();
        assert_eq!(records.len(), 1);
        assert!(records[0].error_message.as_deref().unwrap().contains("HTTP 500"));
        assert_eq!(records[0].total_tokens, 0);
        assert_eq!(records[0].cost, None);
    }

    #[tokio::test]
    async fn test_stream_does_not_record_usage() {
        use futures::StreamExt;

        let fx = fixture(false);
        let user = UserId::new();
        default_provider(&fx.providers, user).await;

        let stream = fx.gateway.stream_chat_completion(user, request(), None).await.unwrap();
        let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;
        assert_eq!(chunks.concat(), "hello");
        assert!(fx.usage.records().is_empty());
    }
}

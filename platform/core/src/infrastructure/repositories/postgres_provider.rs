// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Provider Repository
//!
//! `ProviderConfigRepository` and `ModelRepository` backed by the
//! `ai_provider_configs` and `ai_models` tables. Default flags are moved
//! inside a transaction so the one-default invariants hold at every commit.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;

use crate::domain::provider::{
    ModelCapabilities, ModelDescriptor, ModelId, ProviderConfig, ProviderConfigId, UserId,
};
use crate::domain::repository::{ModelRepository, ProviderConfigRepository, RepositoryError};

const CONFIG_COLUMNS: &str = "id, user_id, provider_type, name, api_key_encrypted, endpoint_url, \
    is_active, is_default, config, created_at, updated_at";

const MODEL_COLUMNS: &str = "id, provider_config_id, model_id, display_name, \
    supports_function_calling, supports_vision, supports_json_mode, \
    input_price_per_1k, output_price_per_1k, max_context_tokens, is_available, is_default";

pub struct PostgresProviderRepository {
    pool: PgPool,
}

impl PostgresProviderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn config_from_row(row: &PgRow) -> Result<ProviderConfig, RepositoryError> {
    let config: serde_json::Value = row.try_get("config")?;
    let config: HashMap<String, serde_json::Value> = match config {
        serde_json::Value::Null => HashMap::new(),
        other => serde_json::from_value(other)?,
    };

    Ok(ProviderConfig {
        id: ProviderConfigId(row.try_get("id")?),
        user_id: UserId(row.try_get("user_id")?),
        provider_type: row.try_get("provider_type")?,
        name: row.try_get("name")?,
        api_key_encrypted: row.try_get("api_key_encrypted")?,
        endpoint_url: row.try_get("endpoint_url")?,
        is_active: row.try_get("is_active")?,
        is_default: row.try_get("is_default")?,
        config,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn model_from_row(row: &PgRow) -> Result<ModelDescriptor, RepositoryError> {
    let max_context_tokens: Option<i32> = row.try_get("max_context_tokens")?;
    Ok(ModelDescriptor {
        id: ModelId(row.try_get("id")?),
        provider_id: ProviderConfigId(row.try_get("provider_config_id")?),
        model_id: row.try_get("model_id")?,
        display_name: row.try_get("display_name")?,
        capabilities: ModelCapabilities {
            function_calling: row.try_get("supports_function_calling")?,
            vision: row.try_get("supports_vision")?,
            json_mode: row.try_get("supports_json_mode")?,
        },
        input_price_per_1k: row.try_get("input_price_per_1k")?,
        output_price_per_1k: row.try_get("output_price_per_1k")?,
        max_context_tokens: max_context_tokens.and_then(|t| u32::try_from(t).ok()),
        is_available: row.try_get("is_available")?,
        is_default: row.try_get("is_default")?,
    })
}

#[async_trait]
impl ProviderConfigRepository for PostgresProviderRepository {
    async fn save(&self, config: &ProviderConfig) -> Result<(), RepositoryError> {
        let config_json = serde_json::to_value(&config.config)?;
        let mut tx = self.pool.begin().await?;

        if config.is_default {
            sqlx::query(
                "UPDATE ai_provider_configs SET is_default = false, updated_at = NOW()
                 WHERE user_id = $1 AND id <> $2 AND is_default = true",
            )
            .bind(config.user_id.0)
            .bind(config.id.0)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO ai_provider_configs (
                id, user_id, provider_type, name, api_key_encrypted, endpoint_url,
                is_active, is_default, config, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO UPDATE SET
                provider_type = EXCLUDED.provider_type,
                name = EXCLUDED.name,
                api_key_encrypted = EXCLUDED.api_key_encrypted,
                endpoint_url = EXCLUDED.endpoint_url,
                is_active = EXCLUDED.is_active,
                is_default = EXCLUDED.is_default,
                config = EXCLUDED.config,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(config.id.0)
        .bind(config.user_id.0)
        .bind(&config.provider_type)
        .bind(&config.name)
        .bind(&config.api_key_encrypted)
        .bind(&config.endpoint_url)
        .bind(config.is_active)
        .bind(config.is_default)
        .bind(config_json)
        .bind(config.created_at)
        .bind(config.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_by_id(&self, id: ProviderConfigId) -> Result<Option<ProviderConfig>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM ai_provider_configs WHERE id = $1", CONFIG_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(config_from_row).transpose()
    }

    async fn find_default_for_user(&self, user_id: UserId) -> Result<Option<ProviderConfig>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ai_provider_configs WHERE user_id = $1 AND is_default = true LIMIT 1",
            CONFIG_COLUMNS
        ))
        .bind(user_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(config_from_row).transpose()
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ProviderConfig>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ai_provider_configs WHERE user_id = $1 ORDER BY created_at ASC",
            CONFIG_COLUMNS
        ))
        .bind(user_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(config_from_row).collect()
    }

    async fn delete(&self, id: ProviderConfigId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM ai_models WHERE provider_config_id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM ai_provider_configs WHERE id = $1")
            .bind(id.0)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("provider config {}", id)));
        }

        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ModelRepository for PostgresProviderRepository {
    async fn save_model(&self, model: &ModelDescriptor) -> Result<(), RepositoryError> {
        let max_context_tokens = model.max_context_tokens.and_then(|t| i32::try_from(t).ok());
        let mut tx = self.pool.begin().await?;

        if model.is_default {
            sqlx::query(
                "UPDATE ai_models SET is_default = false
                 WHERE provider_config_id = $1 AND id <> $2 AND is_default = true",
            )
            .bind(model.provider_id.0)
            .bind(model.id.0)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO ai_models (
                id, provider_config_id, model_id, display_name,
                supports_function_calling, supports_vision, supports_json_mode,
                input_price_per_1k, output_price_per_1k, max_context_tokens,
                is_available, is_default
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                model_id = EXCLUDED.model_id,
                display_name = EXCLUDED.display_name,
                supports_function_calling = EXCLUDED.supports_function_calling,
                supports_vision = EXCLUDED.supports_vision,
                supports_json_mode = EXCLUDED.supports_json_mode,
                input_price_per_1k = EXCLUDED.input_price_per_1k,
                output_price_per_1k = EXCLUDED.output_price_per_1k,
                max_context_tokens = EXCLUDED.max_context_tokens,
                is_available = EXCLUDED.is_available,
                is_default = EXCLUDED.is_default
            "#,
        )
        .bind(model.id.0)
        .bind(model.provider_id.0)
        .bind(&model.model_id)
        .bind(&model.display_name)
        .bind(model.capabilities.function_calling)
        .bind(model.capabilities.vision)
        .bind(model.capabilities.json_mode)
        .bind(model.input_price_per_1k)
        .bind(model.output_price_per_1k)
        .bind(max_context_tokens)
        .bind(model.is_available)
        .bind(model.is_default)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_model(&self, id: ModelId) -> Result<Option<ModelDescriptor>, RepositoryError> {
        let row = sqlx::query(&format!("SELECT {} FROM ai_models WHERE id = $1", MODEL_COLUMNS))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(model_from_row).transpose()
    }

    async fn list_models(&self, provider_id: ProviderConfigId) -> Result<Vec<ModelDescriptor>, RepositoryError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM ai_models WHERE provider_config_id = $1 ORDER BY model_id ASC",
            MODEL_COLUMNS
        ))
        .bind(provider_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(model_from_row).collect()
    }

    async fn find_default_model(&self, provider_id: ProviderConfigId) -> Result<Option<ModelDescriptor>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ai_models WHERE provider_config_id = $1 AND is_default = true LIMIT 1",
            MODEL_COLUMNS
        ))
        .bind(provider_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(model_from_row).transpose()
    }

    async fn find_model_by_name(
        &self,
        provider_id: ProviderConfigId,
        model_id: &str,
    ) -> Result<Option<ModelDescriptor>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM ai_models WHERE provider_config_id = $1 AND model_id = $2 LIMIT 1",
            MODEL_COLUMNS
        ))
        .bind(provider_id.0)
        .bind(model_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(model_from_row).transpose()
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Usage Repository
//!
//! Append-only `ai_usage_logs` table. Rows are never updated or deleted here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::domain::provider::UserId;
use crate::domain::repository::{RepositoryError, UsageRepository};
use crate::domain::usage::{UsageRecord, UsageSummary};

pub struct PostgresUsageRepository {
    pool: PgPool,
}

impl PostgresUsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn as_count(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl UsageRepository for PostgresUsageRepository {
    async fn append(&self, record: &UsageRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO ai_usage_logs (
                id, user_id, provider_config_id, model_id, model_name,
                prompt_tokens, completion_tokens, total_tokens,
                latency_ms, cost, error_message, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id.0)
        .bind(record.provider_id.0)
        .bind(record.model_id.map(|m| m.0))
        .bind(&record.model_name)
        .bind(i64::from(record.prompt_tokens))
        .bind(i64::from(record.completion_tokens))
        .bind(i64::from(record.total_tokens))
        .bind(i64::try_from(record.latency_ms).unwrap_or(i64::MAX))
        .bind(record.cost)
        .bind(&record.error_message)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn summarize(
        &self,
        user_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<UsageSummary, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*)::BIGINT AS requests,
                COUNT(error_message)::BIGINT AS failures,
                COALESCE(SUM(prompt_tokens), 0)::BIGINT AS prompt_tokens,
                COALESCE(SUM(completion_tokens), 0)::BIGINT AS completion_tokens,
                COALESCE(SUM(total_tokens), 0)::BIGINT AS total_tokens,
                COALESCE(SUM(cost), 0)::DOUBLE PRECISION AS total_cost
            FROM ai_usage_logs
            WHERE user_id = $1 AND ($2::TIMESTAMPTZ IS NULL OR created_at >= $2)
            "#,
        )
        .bind(user_id.0)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(UsageSummary {
            requests: as_count(row.try_get("requests")?),
            failures: as_count(row.try_get("failures")?),
            prompt_tokens: as_count(row.try_get("prompt_tokens")?),
            completion_tokens: as_count(row.try_get("completion_tokens")?),
            total_tokens: as_count(row.try_get("total_tokens")?),
            total_cost: row.try_get("total_cost")?,
        })
    }
}

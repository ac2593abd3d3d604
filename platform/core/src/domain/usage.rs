// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # AI Usage Log
//!
//! Append-only record of every gateway call, successful or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::llm::TokenUsage;
use super::provider::{ModelId, ProviderConfigId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub user_id: UserId,
    pub provider_id: ProviderConfigId,

    /// Catalogue entry matched for the call, when one exists
    pub model_id: Option<ModelId>,

    /// Vendor model identifier that served (or was meant to serve) the call
    pub model_name: String,

    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub latency_ms: u64,
    pub cost: Option<f64>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn success(
        user_id: UserId,
        provider_id: ProviderConfigId,
        model_id: Option<ModelId>,
        model_name: impl Into<String>,
        usage: TokenUsage,
        latency_ms: u64,
        cost: Option<f64>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider_id,
            model_id,
            model_name: model_name.into(),
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            latency_ms,
            cost,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    pub fn failure(
        user_id: UserId,
        provider_id: ProviderConfigId,
        model_id: Option<ModelId>,
        model_name: impl Into<String>,
        latency_ms: u64,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            provider_id,
            model_id,
            model_name: model_name.into(),
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            latency_ms,
            cost: None,
            error_message: Some(error_message.into()),
            created_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

/// Aggregated usage for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub requests: u64,
    pub failures: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
}

impl UsageSummary {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a UsageRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut acc, record| {
            acc.requests += 1;
            if record.is_failure() {
                acc.failures += 1;
            }
            acc.prompt_tokens += u64::from(record.prompt_tokens);
            acc.completion_tokens += u64::from(record.completion_tokens);
            acc.total_tokens += u64::from(record.total_tokens);
            acc.total_cost += record.cost.unwrap_or(0.0);
            acc
        })
    }
}

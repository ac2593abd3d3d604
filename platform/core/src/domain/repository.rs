// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contracts, defined in the domain layer and implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Records | Implementations |
//! |-------|---------|----------------|
//! | `ProviderConfigRepository` | `ProviderConfig` | `InMemoryProviderRepository`, `PostgresProviderRepository` |
//! | `ModelRepository` | `ModelDescriptor` | `InMemoryProviderRepository`, `PostgresProviderRepository` |
//! | `UsageRepository` | `UsageRecord` | `InMemoryUsageRepository`, `PostgresUsageRepository` |
//! | `CurriculumRepository` | `Curriculum`, `Topic`, `Exercise` (read side) | `InMemoryContentRepository`, `PostgresContentRepository` |
//! | `ArtifactRepository` | generated artifacts (write side) | `InMemoryContentRepository`, `PostgresContentRepository` |
//!
//! Every `ArtifactRepository` write is atomic per artifact group: a quiz with
//! its questions and options, or the full replacement set of AI hints for an
//! exercise, either lands completely or not at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::artifact::{
    ExerciseHint, ExerciseTestCase, Quiz, TopicContentVariation, TopicReview,
};
use crate::domain::curriculum::{Curriculum, CurriculumId, Exercise, ExerciseId, Topic, TopicId};
use crate::domain::provider::{ModelDescriptor, ModelId, ProviderConfig, ProviderConfigId, UserId};
use crate::domain::usage::{UsageRecord, UsageSummary};

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub connection_string: String,
    pub max_connections: u32,
}

#[async_trait]
pub trait ProviderConfigRepository: Send + Sync {
    /// Create or update. Saving a default config clears the default flag on
    /// every other config of the same user in the same unit of work.
    async fn save(&self, config: &ProviderConfig) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: ProviderConfigId) -> Result<Option<ProviderConfig>, RepositoryError>;

    async fn find_default_for_user(&self, user_id: UserId) -> Result<Option<ProviderConfig>, RepositoryError>;

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ProviderConfig>, RepositoryError>;

    /// Also removes the provider's model catalogue
    async fn delete(&self, id: ProviderConfigId) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait ModelRepository: Send + Sync {
    /// Create or update. Saving a default model clears the default flag on
    /// the provider's other models.
    async fn save_model(&self, model: &ModelDescriptor) -> Result<(), RepositoryError>;

    async fn find_model(&self, id: ModelId) -> Result<Option<ModelDescriptor>, RepositoryError>;

    async fn list_models(&self, provider_id: ProviderConfigId) -> Result<Vec<ModelDescriptor>, RepositoryError>;

    async fn find_default_model(&self, provider_id: ProviderConfigId) -> Result<Option<ModelDescriptor>, RepositoryError>;

    /// Look up by vendor model identifier
    async fn find_model_by_name(
        &self,
        provider_id: ProviderConfigId,
        model_id: &str,
    ) -> Result<Option<ModelDescriptor>, RepositoryError>;
}

#[async_trait]
pub trait UsageRepository: Send + Sync {
    async fn append(&self, record: &UsageRecord) -> Result<(), RepositoryError>;

    async fn summarize(
        &self,
        user_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<UsageSummary, RepositoryError>;
}

#[async_trait]
pub trait CurriculumRepository: Send + Sync {
    async fn find_curriculum(&self, id: CurriculumId) -> Result<Option<Curriculum>, RepositoryError>;

    /// Topics ordered by `order_index`
    async fn list_topics(&self, curriculum_id: CurriculumId) -> Result<Vec<Topic>, RepositoryError>;

    async fn find_topic(&self, id: TopicId) -> Result<Option<Topic>, RepositoryError>;

    async fn find_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>, RepositoryError>;
}

#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    async fn insert_exercise(&self, exercise: &Exercise) -> Result<(), RepositoryError>;

    /// Delete the exercise's AI-generated hints, then insert `hints`.
    /// Hand-written hints are left untouched.
    async fn replace_ai_hints(
        &self,
        exercise_id: ExerciseId,
        hints: &[ExerciseHint],
    ) -> Result<(), RepositoryError>;

    /// Delete the exercise's AI-generated test cases, then insert `test_cases`
    async fn replace_ai_test_cases(
        &self,
        exercise_id: ExerciseId,
        test_cases: &[ExerciseTestCase],
    ) -> Result<(), RepositoryError>;

    /// Insert the quiz with all questions and options
    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), RepositoryError>;

    async fn insert_content_variation(&self, variation: &TopicContentVariation) -> Result<(), RepositoryError>;

    async fn insert_topic_review(&self, review: &TopicReview) -> Result<(), RepositoryError>;

    /// Hints ordered by `hint_level`
    async fn list_hints(&self, exercise_id: ExerciseId) -> Result<Vec<ExerciseHint>, RepositoryError>;

    /// Test cases ordered by `order_index`
    async fn list_test_cases(&self, exercise_id: ExerciseId) -> Result<Vec<ExerciseTestCase>, RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => RepositoryError::NotFound("Row not found".to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.to_string())
            }
            other => RepositoryError::Database(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Repository Implementations
//!
//! Infrastructure implementations of the repository abstractions defined in
//! `crate::domain::repository`.
//!
//! # Available Implementations
//!
//! ## PostgreSQL Repositories
//!
//! - **PostgresProviderRepository** - provider configs and model catalogue
//! - **PostgresUsageRepository** - append-only AI usage log
//! - **PostgresContentRepository** - curricula, topics, exercises and every
//!   generated artifact table
//!
//! ## In-Memory Repositories
//!
//! HashMap-backed implementations for tests and local tooling. Each write
//! takes a single lock, so multi-row writes are as atomic here as they are
//! in the PostgreSQL transactions.
//!
//! # Usage
//!
//! ```no_run
//! # async fn example(database_url: &str) -> anyhow::Result<()> {
//! use edugen_core::infrastructure::db::Database;
//! use edugen_core::infrastructure::repositories::PostgresProviderRepository;
//!
//! let db = Database::new(database_url).await?;
//! let repo = PostgresProviderRepository::new(db.get_pool().clone());
//! # Ok(())
//! # }
//! ```

pub mod postgres_content;
pub mod postgres_provider;
pub mod postgres_usage;

pub use postgres_content::PostgresContentRepository;
pub use postgres_provider::PostgresProviderRepository;
pub use postgres_usage::PostgresUsageRepository;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::domain::artifact::{
    ExerciseHint, ExerciseTestCase, Quiz, TopicContentVariation, TopicReview,
};
use crate::domain::curriculum::{Curriculum, CurriculumId, Exercise, ExerciseId, Topic, TopicId};
use crate::domain::provider::{ModelDescriptor, ModelId, ProviderConfig, ProviderConfigId, UserId};
use crate::domain::repository::{
    ArtifactRepository, CurriculumRepository, ModelRepository, ProviderConfigRepository,
    RepositoryError, UsageRepository,
};
use crate::domain::usage::{UsageRecord, UsageSummary};

// ============================================================================
// Providers and models
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryProviderRepository {
    configs: Arc<RwLock<HashMap<ProviderConfigId, ProviderConfig>>>,
    models: Arc<RwLock<HashMap<ModelId, ModelDescriptor>>>,
}

impl InMemoryProviderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProviderConfigRepository for InMemoryProviderRepository {
    async fn save(&self, config: &ProviderConfig) -> Result<(), RepositoryError> {
        let mut configs = self.configs.write();
        if config.is_default {
            for other in configs.values_mut() {
                if other.user_id == config.user_id && other.id != config.id {
                    other.is_default = false;
                }
            }
        }
        configs.insert(config.id, config.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: ProviderConfigId) -> Result<Option<ProviderConfig>, RepositoryError> {
        Ok(self.configs.read().get(&id).cloned())
    }

    async fn find_default_for_user(&self, user_id: UserId) -> Result<Option<ProviderConfig>, RepositoryError> {
        Ok(self
            .configs
            .read()
            .values()
            .find(|c| c.user_id == user_id && c.is_default)
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<ProviderConfig>, RepositoryError> {
        let mut configs: Vec<ProviderConfig> = self
            .configs
            .read()
            .values()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        configs.sort_by_key(|c| c.created_at);
        Ok(configs)
    }

    async fn delete(&self, id: ProviderConfigId) -> Result<(), RepositoryError> {
        if self.configs.write().remove(&id).is_none() {
            return Err(RepositoryError::NotFound(format!("provider config {}", id)));
        }
        self.models.write().retain(|_, m| m.provider_id != id);
        Ok(())
    }
}

#[async_trait]
impl ModelRepository for InMemoryProviderRepository {
    async fn save_model(&self, model: &ModelDescriptor) -> Result<(), RepositoryError> {
        let mut models = self.models.write();
        let duplicate = models.values().any(|m| {
            m.provider_id == model.provider_id && m.model_id == model.model_id && m.id != model.id
        });
        if duplicate {
            return Err(RepositoryError::Conflict(format!(
                "model {} already registered for provider {}",
                model.model_id, model.provider_id
            )));
        }

        if model.is_default {
            for other in models.values_mut() {
                if other.provider_id == model.provider_id && other.id != model.id {
                    other.is_default = false;
                }
            }
        }
        models.insert(model.id, model.clone());
        Ok(())
    }

    async fn find_model(&self, id: ModelId) -> Result<Option<ModelDescriptor>, RepositoryError> {
        Ok(self.models.read().get(&id).cloned())
    }

    async fn list_models(&self, provider_id: ProviderConfigId) -> Result<Vec<ModelDescriptor>, RepositoryError> {
        let mut models: Vec<ModelDescriptor> = self
            .models
            .read()
            .values()
            .filter(|m| m.provider_id == provider_id)
            .cloned()
            .collect();
        models.sort_by(|a, b| a.model_id.cmp(&b.model_id));
        Ok(models)
    }

    async fn find_default_model(&self, provider_id: ProviderConfigId) -> Result<Option<ModelDescriptor>, RepositoryError> {
        Ok(self
            .models
            .read()
            .values()
            .find(|m| m.provider_id == provider_id && m.is_default)
            .cloned())
    }

    async fn find_model_by_name(
        &self,
        provider_id: ProviderConfigId,
        model_id: &str,
    ) -> Result<Option<ModelDescriptor>, RepositoryError> {
        Ok(self
            .models
            .read()
            .values()
            .find(|m| m.provider_id == provider_id && m.model_id == model_id)
            .cloned())
    }
}

// ============================================================================
// Usage
// ============================================================================

#[derive(Clone, Default)]
pub struct InMemoryUsageRepository {
    records: Arc<RwLock<Vec<UsageRecord>>>,
}

impl InMemoryUsageRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every appended record, oldest first
    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl UsageRepository for InMemoryUsageRepository {
    async fn append(&self, record: &UsageRecord) -> Result<(), RepositoryError> {
        self.records.write().push(record.clone());
        Ok(())
    }

    async fn summarize(
        &self,
        user_id: UserId,
        since: Option<DateTime<Utc>>,
    ) -> Result<UsageSummary, RepositoryError> {
        let records = self.records.read();
        Ok(UsageSummary::from_records(records.iter().filter(|r| {
            r.user_id == user_id && since.is_none_or(|since| r.created_at >= since)
        })))
    }
}

// ============================================================================
// Curriculum content and generated artifacts
// ============================================================================

#[derive(Default)]
struct ContentStore {
    curricula: HashMap<CurriculumId, Curriculum>,
    topics: HashMap<TopicId, Topic>,
    exercises: HashMap<ExerciseId, Exercise>,
    hints: Vec<ExerciseHint>,
    test_cases: Vec<ExerciseTestCase>,
    quizzes: Vec<Quiz>,
    variations: Vec<TopicContentVariation>,
    reviews: Vec<TopicReview>,
}

impl ContentStore {
    fn require_topic(&self, id: TopicId) -> Result<(), RepositoryError> {
        if self.topics.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(format!("topic {}", id)))
        }
    }

    fn require_exercise(&self, id: ExerciseId) -> Result<(), RepositoryError> {
        if self.exercises.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound(format!("exercise {}", id)))
        }
    }
}

#[derive(Clone, Default)]
pub struct InMemoryContentRepository {
    store: Arc<RwLock<ContentStore>>,
}

impl InMemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_curriculum(&self, curriculum: Curriculum) {
        self.store.write().curricula.insert(curriculum.id, curriculum);
    }

    pub fn insert_topic(&self, topic: Topic) {
        self.store.write().topics.insert(topic.id, topic);
    }

    /// Add a single hint as-is, e.g. a hand-written one
    pub fn insert_hint(&self, hint: ExerciseHint) {
        self.store.write().hints.push(hint);
    }

    pub fn quizzes(&self) -> Vec<Quiz> {
        self.store.read().quizzes.clone()
    }

    pub fn content_variations(&self) -> Vec<TopicContentVariation> {
        self.store.read().variations.clone()
    }

    pub fn topic_reviews(&self) -> Vec<TopicReview> {
        self.store.read().reviews.clone()
    }

    pub fn exercises(&self) -> Vec<Exercise> {
        let mut exercises: Vec<Exercise> = self.store.read().exercises.values().cloned().collect();
        exercises.sort_by_key(|e| e.created_at);
        exercises
    }
}

#[async_trait]
impl CurriculumRepository for InMemoryContentRepository {
    async fn find_curriculum(&self, id: CurriculumId) -> Result<Option<Curriculum>, RepositoryError> {
        Ok(self.store.read().curricula.get(&id).cloned())
    }

    async fn list_topics(&self, curriculum_id: CurriculumId) -> Result<Vec<Topic>, RepositoryError> {
        let mut topics: Vec<Topic> = self
            .store
            .read()
            .topics
            .values()
            .filter(|t| t.curriculum_id == curriculum_id)
            .cloned()
            .collect();
        topics.sort_by_key(|t| t.order_index);
        Ok(topics)
    }

    async fn find_topic(&self, id: TopicId) -> Result<Option<Topic>, RepositoryError> {
        Ok(self.store.read().topics.get(&id).cloned())
    }

    async fn find_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>, RepositoryError> {
        Ok(self.store.read().exercises.get(&id).cloned())
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryContentRepository {
    async fn insert_exercise(&self, exercise: &Exercise) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        store.require_topic(exercise.topic_id)?;
        if store.exercises.contains_key(&exercise.id) {
            return Err(RepositoryError::Conflict(format!("exercise {}", exercise.id)));
        }
        store.exercises.insert(exercise.id, exercise.clone());
        Ok(())
    }

    async fn replace_ai_hints(
        &self,
        exercise_id: ExerciseId,
        hints: &[ExerciseHint],
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        store.require_exercise(exercise_id)?;
        store
            .hints
            .retain(|h| !(h.exercise_id == exercise_id && h.provenance.generated_by_ai));
        store.hints.extend_from_slice(hints);
        Ok(())
    }

    async fn replace_ai_test_cases(
        &self,
        exercise_id: ExerciseId,
        test_cases: &[ExerciseTestCase],
    ) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        store.require_exercise(exercise_id)?;
        store
            .test_cases
            .retain(|t| !(t.exercise_id == exercise_id && t.provenance.generated_by_ai));
        store.test_cases.extend_from_slice(test_cases);
        Ok(())
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        store.require_topic(quiz.topic_id)?;
        store.quizzes.push(quiz.clone());
        Ok(())
    }

    async fn insert_content_variation(&self, variation: &TopicContentVariation) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        store.require_topic(variation.topic_id)?;
        store.variations.push(variation.clone());
        Ok(())
    }

    async fn insert_topic_review(&self, review: &TopicReview) -> Result<(), RepositoryError> {
        let mut store = self.store.write();
        store.require_topic(review.topic_id)?;
        store.reviews.push(review.clone());
        Ok(())
    }

    async fn list_hints(&self, exercise_id: ExerciseId) -> Result<Vec<ExerciseHint>, RepositoryError> {
        let mut hints: Vec<ExerciseHint> = self
            .store
            .read()
            .hints
            .iter()
            .filter(|h| h.exercise_id == exercise_id)
            .cloned()
            .collect();
        hints.sort_by_key(|h| (h.hint_level, h.order_index));
        Ok(hints)
    }

    async fn list_test_cases(&self, exercise_id: ExerciseId) -> Result<Vec<ExerciseTestCase>, RepositoryError> {
        let mut cases: Vec<ExerciseTestCase> = self
            .store
            .read()
            .test_cases
            .iter()
            .filter(|t| t.exercise_id == exercise_id)
            .cloned()
            .collect();
        cases.sort_by_key(|t| t.order_index);
        Ok(cases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artifact::Provenance;
    use crate::domain::llm::TokenUsage;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_saving_default_unsets_previous_default() {
        let repo = InMemoryProviderRepository::new();
        let user = UserId::new();

        let mut first = ProviderConfig::new(user, "openai", "first");
        first.is_default = true;
        repo.save(&first).await.unwrap();

        let mut second = ProviderConfig::new(user, "anthropic", "second");
        second.is_default = true;
        repo.save(&second).await.unwrap();

        let default = repo.find_default_for_user(user).await.unwrap().unwrap();
        assert_eq!(default.id, second.id);
        let defaults = repo
            .list_by_user(user)
            .await
            .unwrap()
            .into_iter()
            .filter(|c| c.is_default)
            .count();
        assert_eq!(defaults, 1);
    }

    #[tokio::test]
    async fn test_defaults_are_per_user() {
        let repo = InMemoryProviderRepository::new();
        let mut mine = ProviderConfig::new(UserId::new(), "openai", "mine");
        mine.is_default = true;
        let mut theirs = ProviderConfig::new(UserId::new(), "openai", "theirs");
        theirs.is_default = true;

        repo.save(&mine).await.unwrap();
        repo.save(&theirs).await.unwrap();

        assert!(repo.find_by_id(mine.id).await.unwrap().unwrap().is_default);
        assert!(repo.find_by_id(theirs.id).await.unwrap().unwrap().is_default);
    }

    #[tokio::test]
    async fn test_duplicate_model_name_conflicts() {
        let repo = InMemoryProviderRepository::new();
        let provider = ProviderConfigId::new();
        repo.save_model(&ModelDescriptor::new(provider, "gpt-4o")).await.unwrap();

        let err = repo
            .save_model(&ModelDescriptor::new(provider, "gpt-4o"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_models() {
        let repo = InMemoryProviderRepository::new();
        let config = ProviderConfig::new(UserId::new(), "ollama", "local");
        repo.save(&config).await.unwrap();
        repo.save_model(&ModelDescriptor::new(config.id, "llama3.2")).await.unwrap();

        repo.delete(config.id).await.unwrap();
        assert!(repo.list_models(config.id).await.unwrap().is_empty());
        assert!(matches!(repo.delete(config.id).await, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_usage_summary_filters_user_and_time() {
        let repo = InMemoryUsageRepository::new();
        let user = UserId::new();
        let provider = ProviderConfigId::new();

        let mut old = UsageRecord::success(user, provider, None, "m", TokenUsage::new(5, 5), 10, None);
        old.created_at = Utc::now() - chrono::Duration::days(2);
        repo.append(&old).await.unwrap();
        repo.append(&UsageRecord::success(user, provider, None, "m", TokenUsage::new(1, 2), 10, Some(0.1)))
            .await
            .unwrap();
        repo.append(&UsageRecord::failure(UserId::new(), provider, None, "m", 10, "boom"))
            .await
            .unwrap();

        let all = repo.summarize(user, None).await.unwrap();
        assert_eq!(all.requests, 2);

        let recent = repo
            .summarize(user, Some(Utc::now() - chrono::Duration::hours(1)))
            .await
            .unwrap();
        assert_eq!(recent.requests, 1);
        assert_eq!(recent.total_tokens, 3);
    }

    #[tokio::test]
    async fn test_replace_ai_hints_keeps_manual_hints() {
        let repo = InMemoryContentRepository::new();
        let user = UserId::new();
        let topic = Topic {
            id: TopicId::new(),
            curriculum_id: CurriculumId::new(),
            title: "Loops".into(),
            description: None,
            content: "for loops".into(),
            difficulty: Default::default(),
            order_index: 0,
        };
        repo.insert_topic(topic.clone());

        let exercise = Exercise {
            id: ExerciseId::new(),
            topic_id: topic.id,
            title: "Sum".into(),
            description: "Sum numbers".into(),
            instructions: "Write sum".into(),
            starter_code: String::new(),
            solution_code: "return a+b;".into(),
            language: "javascript".into(),
            difficulty: Default::default(),
            provenance: Provenance::manual(user),
            created_at: Utc::now(),
        };
        repo.insert_exercise(&exercise).await.unwrap();

        let hint = |level: i32, provenance: Provenance| ExerciseHint {
            id: Uuid::new_v4(),
            exercise_id: exercise.id,
            hint_level: level,
            content: format!("hint {}", level),
            order_index: level - 1,
            provenance,
        };
        let ai = Provenance::ai(user, ProviderConfigId::new(), "gpt-4o");

        repo.insert_hint(hint(1, Provenance::manual(user)));
        repo.replace_ai_hints(exercise.id, &[hint(2, ai.clone()), hint(3, ai.clone())])
            .await
            .unwrap();
        repo.replace_ai_hints(exercise.id, &[hint(2, ai.clone())]).await.unwrap();

        let hints = repo.list_hints(exercise.id).await.unwrap();
        assert_eq!(hints.len(), 2);
        assert!(!hints[0].provenance.generated_by_ai);
        assert!(hints[1].provenance.generated_by_ai);
    }

    #[tokio::test]
    async fn test_artifacts_require_parent() {
        let repo = InMemoryContentRepository::new();
        let err = repo.replace_ai_hints(ExerciseId::new(), &[]).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound(_)));
    }
}

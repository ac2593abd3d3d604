// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Curriculum Generator - topic suggestions, learning objectives, content variations
//
// Suggestions and objectives are returned to the caller for review and are
// not written here; accepted ones are stored through the regular curriculum
// editing flow.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::{check_count, log_persisted, prompts, require_text, GenerationError, GenerationPipeline, ITEM_COUNT_RANGE};
use crate::domain::artifact::{
    ArtifactDraft, ContentVariationDraft, LearningObjective, ObjectiveSet, TopicContentVariation,
    TopicSuggestion, TopicSuggestionSet,
};
use crate::domain::curriculum::{CurriculumId, Topic, TopicId};
use crate::domain::provider::{ProviderConfigId, UserId};
use crate::domain::repository::{ArtifactRepository, CurriculumRepository};

pub struct CurriculumGenerator {
    pipeline: Arc<GenerationPipeline>,
    curriculum: Arc<dyn CurriculumRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
}

impl CurriculumGenerator {
    pub fn new(
        pipeline: Arc<GenerationPipeline>,
        curriculum: Arc<dyn CurriculumRepository>,
        artifacts: Arc<dyn ArtifactRepository>,
    ) -> Self {
        Self {
            pipeline,
            curriculum,
            artifacts,
        }
    }

    async fn load_topic(&self, id: TopicId) -> Result<Topic, GenerationError> {
        self.curriculum
            .find_topic(id)
            .await?
            .ok_or_else(|| GenerationError::NotFound(format!("topic {}", id)))
    }

    pub async fn suggest_topics(
        &self,
        user_id: UserId,
        curriculum_id: CurriculumId,
        count: u32,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<Vec<TopicSuggestion>, GenerationError> {
        check_count("count", count, &ITEM_COUNT_RANGE)?;
        let curriculum = self
            .curriculum
            .find_curriculum(curriculum_id)
            .await?
            .ok_or_else(|| GenerationError::NotFound(format!("curriculum {}", curriculum_id)))?;
        let existing = self.curriculum.list_topics(curriculum.id).await?;

        let prompt = prompts::topic_suggestions_prompt(&curriculum, &existing, count);
        let generated = self
            .pipeline
            .generate::<TopicSuggestionSet>(user_id, provider_id, prompt)
            .await?;
        let provenance = generated.provenance(user_id);

        let mut set = generated.draft;
        set.0.truncate(count as usize);
        let suggestions = set.into_suggestions(curriculum.difficulty, &provenance);

        info!(
            user_id = %user_id,
            curriculum_id = %curriculum.id,
            count = suggestions.len(),
            "Generated topic suggestions"
        );
        Ok(suggestions)
    }

    pub async fn generate_objectives(
        &self,
        user_id: UserId,
        topic_id: TopicId,
        count: u32,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<Vec<LearningObjective>, GenerationError> {
        check_count("count", count, &ITEM_COUNT_RANGE)?;
        let topic = self.load_topic(topic_id).await?;

        let prompt = prompts::objectives_prompt(&topic, count);
        let generated = self.pipeline.generate::<ObjectiveSet>(user_id, provider_id, prompt).await?;
        let provenance = generated.provenance(user_id);

        let mut set = generated.draft;
        set.0.truncate(count as usize);
        let objectives = set.into_objectives(topic.id, &provenance);

        info!(user_id = %user_id, topic_id = %topic.id, count = objectives.len(), "Generated learning objectives");
        Ok(objectives)
    }

    pub async fn generate_content_variation(
        &self,
        user_id: UserId,
        topic_id: TopicId,
        variation_type: &str,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<TopicContentVariation, GenerationError> {
        require_text("variation type", variation_type)?;
        let variation_type = variation_type.trim().to_lowercase();
        let topic = self.load_topic(topic_id).await?;

        let prompt = prompts::content_variation_prompt(&topic, &variation_type);
        let generated = self
            .pipeline
            .generate::<ContentVariationDraft>(user_id, provider_id, prompt)
            .await?;
        let provenance = generated.provenance(user_id);
        let draft = generated.draft;

        let title = draft
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("{} ({})", topic.title, variation_type));

        let variation = TopicContentVariation {
            id: Uuid::new_v4(),
            topic_id: topic.id,
            variation_type,
            title,
            content: draft.content,
            provenance,
            created_at: Utc::now(),
        };
        self.artifacts.insert_content_variation(&variation).await?;
        log_persisted(ContentVariationDraft::KIND, 1);

        info!(
            user_id = %user_id,
            topic_id = %topic.id,
            variation_type = %variation.variation_type,
            "Generated content variation"
        );
        Ok(variation)
    }
}

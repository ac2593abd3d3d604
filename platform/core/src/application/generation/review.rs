// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Review Generator - scored topic reviews and per-finding deep dives

use std::sync::Arc;

use tracing::info;

use super::{log_persisted, prompts, GenerationError, GenerationPipeline};
use crate::domain::artifact::{ArtifactDraft, DeepDive, DeepDiveDraft, ReviewDraft, ReviewFinding, TopicReview};
use crate::domain::curriculum::{Topic, TopicId};
use crate::domain::provider::{ProviderConfigId, UserId};
use crate::domain::repository::{ArtifactRepository, CurriculumRepository};

pub struct ReviewGenerator {
    pipeline: Arc<GenerationPipeline>,
    curriculum: Arc<dyn CurriculumRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
}

impl ReviewGenerator {
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

    pub async fn review_topic(
        &self,
        user_id: UserId,
        topic_id: TopicId,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<TopicReview, GenerationError> {
        let topic = self.load_topic(topic_id).await?;

        let prompt = prompts::review_prompt(&topic);
        let generated = self.pipeline.generate::<ReviewDraft>(user_id, provider_id, prompt).await?;
        let provenance = generated.provenance(user_id);
        let review = generated.draft.into_review(topic.id, &provenance);

        self.artifacts.insert_topic_review(&review).await?;
        log_persisted(ReviewDraft::KIND, review.findings.len());

        info!(
            user_id = %user_id,
            topic_id = %topic.id,
            score = review.overall_score,
            findings = review.findings.len(),
            "Generated topic review"
        );
        Ok(review)
    }

    /// Expands one finding from an earlier review. Not persisted.
    pub async fn deep_dive(
        &self,
        user_id: UserId,
        topic_id: TopicId,
        finding: ReviewFinding,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<DeepDive, GenerationError> {
        if finding.title.trim().is_empty() && finding.description.trim().is_empty() {
            return Err(GenerationError::InvalidInput("finding has no title or description".into()));
        }
        let topic = self.load_topic(topic_id).await?;

        let prompt = prompts::deep_dive_prompt(&topic, &finding);
        let generated = self.pipeline.generate::<DeepDiveDraft>(user_id, provider_id, prompt).await?;
        let provenance = generated.provenance(user_id);
        let draft = generated.draft;

        info!(user_id = %user_id, topic_id = %topic.id, finding = %finding.title, "Generated finding deep dive");
        Ok(DeepDive {
            topic_id: topic.id,
            finding,
            explanation: draft.explanation,
            examples: draft.examples,
            suggestions: draft.suggestions,
            revised_content: draft.revised_content.filter(|c| !c.trim().is_empty()),
            provenance,
        })
    }
}

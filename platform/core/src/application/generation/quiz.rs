// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::sync::Arc;

use tracing::info;

use super::{check_count, log_persisted, prompts, GenerationError, GenerationPipeline, QUIZ_QUESTION_RANGE};
use crate::domain::artifact::{ArtifactDraft, Quiz, QuizDraft};
use crate::domain::curriculum::TopicId;
use crate::domain::provider::{ProviderConfigId, UserId};
use crate::domain::repository::{ArtifactRepository, CurriculumRepository};

pub struct QuizGenerator {
    pipeline: Arc<GenerationPipeline>,
    curriculum: Arc<dyn CurriculumRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
}

impl QuizGenerator {
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

    /// Quiz, questions and options are stored as one unit
    pub async fn generate_quiz(
        &self,
        user_id: UserId,
        topic_id: TopicId,
        num_questions: u32,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<Quiz, GenerationError> {
        check_count("numQuestions", num_questions, &QUIZ_QUESTION_RANGE)?;
        let topic = self
            .curriculum
            .find_topic(topic_id)
            .await?
            .ok_or_else(|| GenerationError::NotFound(format!("topic {}", topic_id)))?;

        let prompt = prompts::quiz_prompt(&topic, num_questions);
        let generated = self.pipeline.generate::<QuizDraft>(user_id, provider_id, prompt).await?;
        let provenance = generated.provenance(user_id);

        let default_title = format!("{} Quiz", topic.title);
        let mut quiz = generated
            .draft
            .into_quiz(topic.id, &default_title, topic.difficulty, &provenance);
        quiz.questions.truncate(num_questions as usize);

        self.artifacts.insert_quiz(&quiz).await?;
        log_persisted(QuizDraft::KIND, quiz.questions.len());

        info!(
            user_id = %user_id,
            topic_id = %topic.id,
            quiz_id = %quiz.id,
            questions = quiz.questions.len(),
            "Generated quiz"
        );
        Ok(quiz)
    }
}

// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Exercise Generator - exercises, progressive hints and test cases

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::{
    check_count, log_persisted, prompts, require_text, GenerationError, GenerationPipeline,
    ITEM_COUNT_RANGE,
};
use crate::domain::artifact::{
    ArtifactDraft, ExerciseDraft, ExerciseHint, ExerciseTestCase, HintSet, TestCaseSet,
};
use crate::domain::curriculum::{DifficultyLevel, Exercise, ExerciseId, TopicId};
use crate::domain::provider::{ProviderConfigId, UserId};
use crate::domain::repository::{ArtifactRepository, CurriculumRepository};

#[derive(Debug, Clone)]
pub struct ExerciseRequest {
    pub topic_id: TopicId,
    pub language: String,
    /// Defaults to the topic's difficulty
    pub difficulty: Option<DifficultyLevel>,
    pub focus: Option<String>,
}

pub struct ExerciseGenerator {
    pipeline: Arc<GenerationPipeline>,
    curriculum: Arc<dyn CurriculumRepository>,
    artifacts: Arc<dyn ArtifactRepository>,
}

impl ExerciseGenerator {
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

    async fn load_exercise(&self, id: ExerciseId) -> Result<Exercise, GenerationError> {
        self.curriculum
            .find_exercise(id)
            .await?
            .ok_or_else(|| GenerationError::NotFound(format!("exercise {}", id)))
    }

    pub async fn generate_exercise(
        &self,
        user_id: UserId,
        request: ExerciseRequest,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<Exercise, GenerationError> {
        require_text("language", &request.language)?;
        let topic = self
            .curriculum
            .find_topic(request.topic_id)
            .await?
            .ok_or_else(|| GenerationError::NotFound(format!("topic {}", request.topic_id)))?;

        let language = request.language.trim().to_lowercase();
        let difficulty = request.difficulty.unwrap_or(topic.difficulty);
        let prompt = prompts::exercise_prompt(&topic, &language, difficulty, request.focus.as_deref());

        let generated = self.pipeline.generate::<ExerciseDraft>(user_id, provider_id, prompt).await?;
        let provenance = generated.provenance(user_id);
        let draft = generated.draft;

        let exercise = Exercise {
            id: ExerciseId::new(),
            topic_id: topic.id,
            title: draft.title.trim().to_string(),
            description: draft.description,
            instructions: draft.instructions,
            starter_code: draft.starter_code,
            solution_code: draft.solution_code,
            language,
            difficulty,
            provenance,
            created_at: Utc::now(),
        };
        self.artifacts.insert_exercise(&exercise).await?;
        log_persisted(ExerciseDraft::KIND, 1);

        info!(user_id = %user_id, exercise_id = %exercise.id, topic_id = %topic.id, "Generated exercise");
        Ok(exercise)
    }

    /// Replaces the exercise's previous AI hints. Hint levels run 1..=n.
    pub async fn generate_hints(
        &self,
        user_id: UserId,
        exercise_id: ExerciseId,
        num_hints: u32,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<Vec<ExerciseHint>, GenerationError> {
        check_count("numHints", num_hints, &ITEM_COUNT_RANGE)?;
        let exercise = self.load_exercise(exercise_id).await?;

        let prompt = prompts::hints_prompt(&exercise, num_hints);
        let generated = self.pipeline.generate::<HintSet>(user_id, provider_id, prompt).await?;
        let provenance = generated.provenance(user_id);

        let mut set = generated.draft;
        set.0.truncate(num_hints as usize);
        let hints = set.into_hints(exercise.id, &provenance);

        self.artifacts.replace_ai_hints(exercise.id, &hints).await?;
        log_persisted(HintSet::KIND, hints.len());

        info!(user_id = %user_id, exercise_id = %exercise.id, count = hints.len(), "Generated exercise hints");
        Ok(hints)
    }

    /// Replaces the exercise's previous AI test cases
    pub async fn generate_test_cases(
        &self,
        user_id: UserId,
        exercise_id: ExerciseId,
        count: u32,
        provider_id: Option<ProviderConfigId>,
    ) -> Result<Vec<ExerciseTestCase>, GenerationError> {
        check_count("count", count, &ITEM_COUNT_RANGE)?;
        let exercise = self.load_exercise(exercise_id).await?;

        let prompt = prompts::test_cases_prompt(&exercise, count);
        let generated = self.pipeline.generate::<TestCaseSet>(user_id, provider_id, prompt).await?;
        let provenance = generated.provenance(user_id);

        let mut set = generated.draft;
        set.0.truncate(count as usize);
        let test_cases = set.into_test_cases(exercise.id, &provenance);

        self.artifacts.replace_ai_test_cases(exercise.id, &test_cases).await?;
        log_persisted(TestCaseSet::KIND, test_cases.len());

        info!(
            user_id = %user_id,
            exercise_id = %exercise.id,
            count = test_cases.len(),
            "Generated exercise test cases"
        );
        Ok(test_cases)
    }
}

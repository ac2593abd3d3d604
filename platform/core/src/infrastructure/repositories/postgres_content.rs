// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # PostgreSQL Content Repository
//!
//! Read access to curricula, topics and exercises, and transactional writes
//! for generated artifacts. Each artifact group (an exercise's hint set, a
//! quiz with its questions and options, ...) is written in one transaction;
//! any failed statement drops the transaction and rolls the group back.
//!
//! Every artifact row carries the provenance columns `generated_by_ai`,
//! `ai_provider_id`, `ai_model` and `created_by`.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Row, Transaction};

use crate::domain::artifact::{
    ExerciseHint, ExerciseTestCase, Provenance, Quiz, TopicContentVariation, TopicReview,
};
use crate::domain::curriculum::{
    Curriculum, CurriculumId, DifficultyLevel, Exercise, ExerciseId, Topic, TopicId,
};
use crate::domain::provider::{ProviderConfigId, UserId};
use crate::domain::repository::{ArtifactRepository, CurriculumRepository, RepositoryError};

const PROVENANCE_COLUMNS: &str = "generated_by_ai, ai_provider_id, ai_model, created_by";

pub struct PostgresContentRepository {
    pool: PgPool,
}

impl PostgresContentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn difficulty_from_row(row: &PgRow) -> Result<DifficultyLevel, RepositoryError> {
    let level: String = row.try_get("difficulty_level")?;
    level.parse().map_err(RepositoryError::Serialization)
}

fn provenance_from_row(row: &PgRow) -> Result<Provenance, RepositoryError> {
    let provider: Option<uuid::Uuid> = row.try_get("ai_provider_id")?;
    Ok(Provenance {
        generated_by_ai: row.try_get("generated_by_ai")?,
        ai_provider_id: provider.map(ProviderConfigId),
        ai_model: row.try_get("ai_model")?,
        created_by: UserId(row.try_get("created_by")?),
    })
}

fn topic_from_row(row: &PgRow) -> Result<Topic, RepositoryError> {
    Ok(Topic {
        id: TopicId(row.try_get("id")?),
        curriculum_id: CurriculumId(row.try_get("curriculum_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        content: row.try_get("content")?,
        difficulty: difficulty_from_row(row)?,
        order_index: row.try_get("order_index")?,
    })
}

fn exercise_from_row(row: &PgRow) -> Result<Exercise, RepositoryError> {
    Ok(Exercise {
        id: ExerciseId(row.try_get("id")?),
        topic_id: TopicId(row.try_get("topic_id")?),
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        instructions: row.try_get("instructions")?,
        starter_code: row.try_get("starter_code")?,
        solution_code: row.try_get("solution_code")?,
        language: row.try_get("language")?,
        difficulty: difficulty_from_row(row)?,
        provenance: provenance_from_row(row)?,
        created_at: row.try_get("created_at")?,
    })
}

/// Remove the AI-generated rows of `table` for one exercise
async fn delete_ai_rows(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    exercise_id: ExerciseId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE exercise_id = $1 AND generated_by_ai = true",
        table
    ))
    .bind(exercise_id.0)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl CurriculumRepository for PostgresContentRepository {
    async fn find_curriculum(&self, id: CurriculumId) -> Result<Option<Curriculum>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, title, description, difficulty_level FROM curricula WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> Result<Curriculum, RepositoryError> {
            Ok(Curriculum {
                id: CurriculumId(row.try_get("id")?),
                title: row.try_get("title")?,
                description: row.try_get("description")?,
                difficulty: difficulty_from_row(&row)?,
            })
        })
        .transpose()
    }

    async fn list_topics(&self, curriculum_id: CurriculumId) -> Result<Vec<Topic>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, curriculum_id, title, description, content, difficulty_level, order_index
            FROM topics
            WHERE curriculum_id = $1
            ORDER BY order_index ASC
            "#,
        )
        .bind(curriculum_id.0)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(topic_from_row).collect()
    }

    async fn find_topic(&self, id: TopicId) -> Result<Option<Topic>, RepositoryError> {
        let row = sqlx::query(
            r#"
            SELECT id, curriculum_id, title, description, content, difficulty_level, order_index
            FROM topics
            WHERE id = $1
            "#,
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(topic_from_row).transpose()
    }

    async fn find_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>, RepositoryError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT id, topic_id, title, description, instructions, starter_code, solution_code,
                   language, difficulty_level, created_at, {}
            FROM exercises
            WHERE id = $1
            "#,
            PROVENANCE_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(exercise_from_row).transpose()
    }
}

#[async_trait]
impl ArtifactRepository for PostgresContentRepository {
    async fn insert_exercise(&self, exercise: &Exercise) -> Result<(), RepositoryError> {
        let p = &exercise.provenance;
        sqlx::query(
            r#"
            INSERT INTO exercises (
                id, topic_id, title, description, instructions, starter_code, solution_code,
                language, difficulty_level, created_at,
                generated_by_ai, ai_provider_id, ai_model, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(exercise.id.0)
        .bind(exercise.topic_id.0)
        .bind(&exercise.title)
        .bind(&exercise.description)
        .bind(&exercise.instructions)
        .bind(&exercise.starter_code)
        .bind(&exercise.solution_code)
        .bind(&exercise.language)
        .bind(exercise.difficulty.as_str())
        .bind(exercise.created_at)
        .bind(p.generated_by_ai)
        .bind(p.ai_provider_id.map(|id| id.0))
        .bind(&p.ai_model)
        .bind(p.created_by.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_ai_hints(
        &self,
        exercise_id: ExerciseId,
        hints: &[ExerciseHint],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let removed = delete_ai_rows(&mut tx, "exercise_hints", exercise_id).await?;

        for hint in hints {
            let p = &hint.provenance;
            sqlx::query(
                r#"
                INSERT INTO exercise_hints (
                    id, exercise_id, hint_level, content, order_index,
                    generated_by_ai, ai_provider_id, ai_model, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(hint.id)
            .bind(exercise_id.0)
            .bind(hint.hint_level)
            .bind(&hint.content)
            .bind(hint.order_index)
            .bind(p.generated_by_ai)
            .bind(p.ai_provider_id.map(|id| id.0))
            .bind(&p.ai_model)
            .bind(p.created_by.0)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(exercise_id = %exercise_id, removed, inserted = hints.len(), "Replaced AI hints");
        Ok(())
    }

    async fn replace_ai_test_cases(
        &self,
        exercise_id: ExerciseId,
        test_cases: &[ExerciseTestCase],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let removed = delete_ai_rows(&mut tx, "exercise_test_cases", exercise_id).await?;

        for case in test_cases {
            let p = &case.provenance;
            sqlx::query(
                r#"
                INSERT INTO exercise_test_cases (
                    id, exercise_id, input, expected_output, is_hidden, description, order_index,
                    generated_by_ai, ai_provider_id, ai_model, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(case.id)
            .bind(exercise_id.0)
            .bind(&case.input)
            .bind(&case.expected_output)
            .bind(case.is_hidden)
            .bind(&case.description)
            .bind(case.order_index)
            .bind(p.generated_by_ai)
            .bind(p.ai_provider_id.map(|id| id.0))
            .bind(&p.ai_model)
            .bind(p.created_by.0)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::debug!(exercise_id = %exercise_id, removed, inserted = test_cases.len(), "Replaced AI test cases");
        Ok(())
    }

    async fn insert_quiz(&self, quiz: &Quiz) -> Result<(), RepositoryError> {
        let p = &quiz.provenance;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO quizzes (
                id, topic_id, title, difficulty_level, created_at,
                generated_by_ai, ai_provider_id, ai_model, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(quiz.id.0)
        .bind(quiz.topic_id.0)
        .bind(&quiz.title)
        .bind(quiz.difficulty.as_str())
        .bind(quiz.created_at)
        .bind(p.generated_by_ai)
        .bind(p.ai_provider_id.map(|id| id.0))
        .bind(&p.ai_model)
        .bind(p.created_by.0)
        .execute(&mut *tx)
        .await?;

        for question in &quiz.questions {
            sqlx::query(
                r#"
                INSERT INTO quiz_questions (
                    id, quiz_id, question_text, question_type, explanation, points, order_index,
                    generated_by_ai, ai_provider_id, ai_model, created_by
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                "#,
            )
            .bind(question.id)
            .bind(quiz.id.0)
            .bind(&question.question_text)
            .bind(question.question_type.as_str())
            .bind(&question.explanation)
            .bind(question.points)
            .bind(question.order_index)
            .bind(p.generated_by_ai)
            .bind(p.ai_provider_id.map(|id| id.0))
            .bind(&p.ai_model)
            .bind(p.created_by.0)
            .execute(&mut *tx)
            .await?;

            for option in &question.options {
                sqlx::query(
                    r#"
                    INSERT INTO quiz_question_options (id, question_id, option_text, is_correct, order_index)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(option.id)
                .bind(question.id)
                .bind(&option.option_text)
                .bind(option.is_correct)
                .bind(option.order_index)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn insert_content_variation(&self, variation: &TopicContentVariation) -> Result<(), RepositoryError> {
        let p = &variation.provenance;
        sqlx::query(
            r#"
            INSERT INTO topic_content_variations (
                id, topic_id, variation_type, title, content, created_at,
                generated_by_ai, ai_provider_id, ai_model, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(variation.id)
        .bind(variation.topic_id.0)
        .bind(&variation.variation_type)
        .bind(&variation.title)
        .bind(&variation.content)
        .bind(variation.created_at)
        .bind(p.generated_by_ai)
        .bind(p.ai_provider_id.map(|id| id.0))
        .bind(&p.ai_model)
        .bind(p.created_by.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_topic_review(&self, review: &TopicReview) -> Result<(), RepositoryError> {
        let p = &review.provenance;
        let findings = serde_json::to_value(&review.findings)?;
        let strengths = serde_json::to_value(&review.strengths)?;

        sqlx::query(
            r#"
            INSERT INTO topic_reviews (
                id, topic_id, overall_score, summary, findings, strengths, created_at,
                generated_by_ai, ai_provider_id, ai_model, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(review.id)
        .bind(review.topic_id.0)
        .bind(review.overall_score)
        .bind(&review.summary)
        .bind(findings)
        .bind(strengths)
        .bind(review.created_at)
        .bind(p.generated_by_ai)
        .bind(p.ai_provider_id.map(|id| id.0))
        .bind(&p.ai_model)
        .bind(p.created_by.0)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_hints(&self, exercise_id: ExerciseId) -> Result<Vec<ExerciseHint>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT id, exercise_id, hint_level, content, order_index, {}
            FROM exercise_hints
            WHERE exercise_id = $1
            ORDER BY hint_level ASC, order_index ASC
            "#,
            PROVENANCE_COLUMNS
        ))
        .bind(exercise_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ExerciseHint, RepositoryError> {
                Ok(ExerciseHint {
                    id: row.try_get("id")?,
                    exercise_id: ExerciseId(row.try_get("exercise_id")?),
                    hint_level: row.try_get("hint_level")?,
                    content: row.try_get("content")?,
                    order_index: row.try_get("order_index")?,
                    provenance: provenance_from_row(row)?,
                })
            })
            .collect()
    }

    async fn list_test_cases(&self, exercise_id: ExerciseId) -> Result<Vec<ExerciseTestCase>, RepositoryError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT id, exercise_id, input, expected_output, is_hidden, description, order_index, {}
            FROM exercise_test_cases
            WHERE exercise_id = $1
            ORDER BY order_index ASC
            "#,
            PROVENANCE_COLUMNS
        ))
        .bind(exercise_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ExerciseTestCase, RepositoryError> {
                Ok(ExerciseTestCase {
                    id: row.try_get("id")?,
                    exercise_id: ExerciseId(row.try_get("exercise_id")?),
                    input: row.try_get("input")?,
                    expected_output: row.try_get("expected_output")?,
                    is_hidden: row.try_get("is_hidden")?,
                    description: row.try_get("description")?,
                    order_index: row.try_get("order_index")?,
                    provenance: provenance_from_row(row)?,
                })
            })
            .collect()
    }
}

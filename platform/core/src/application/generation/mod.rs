// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # Content Generation
//!
//! Every generator runs the same pipeline:
//!
//! ```text
//! PromptBuilt -> AwaitingProvider -> RawTextReceived -> RepairAttempted
//!             -> Validated -> Persisted
//! ```
//!
//! Any stage may end in `Failed`. Nothing is written until the artifact has
//! been repaired and shape-checked, so a failed generation leaves storage
//! untouched.
//!
//! | Generator | Artifacts |
//! |-----------|-----------|
//! | [`ExerciseGenerator`] | exercise, hints, test cases |
//! | [`CurriculumGenerator`] | topic suggestions, learning objectives, content variations |
//! | [`QuizGenerator`] | quizzes |
//! | [`ReviewGenerator`] | topic reviews, deep dives |

pub mod curriculum;
pub mod exercise;
pub mod prompts;
pub mod quiz;
pub mod review;

pub use curriculum::CurriculumGenerator;
pub use exercise::{ExerciseGenerator, ExerciseRequest};
pub use prompts::GenerationPrompt;
pub use quiz::QuizGenerator;
pub use review::ReviewGenerator;

use std::fmt;
use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::application::ai_gateway::{ChatGateway, GatewayError};
use crate::domain::artifact::{ArtifactDraft, ArtifactKind, Provenance, ShapeError};
use crate::domain::provider::{ProviderConfigId, UserId};
use crate::domain::repair::{RepairError, ResponseParser};
use crate::domain::repository::RepositoryError;

/// Item-count bounds for list artifacts
pub const ITEM_COUNT_RANGE: RangeInclusive<u32> = 1..=10;
pub const QUIZ_QUESTION_RANGE: RangeInclusive<u32> = 1..=20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStage {
    PromptBuilt,
    AwaitingProvider,
    RawTextReceived,
    RepairAttempted,
    Validated,
    Persisted,
    Failed,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::PromptBuilt => "prompt_built",
            GenerationStage::AwaitingProvider => "awaiting_provider",
            GenerationStage::RawTextReceived => "raw_text_received",
            GenerationStage::RepairAttempted => "repair_attempted",
            GenerationStage::Validated => "validated",
            GenerationStage::Persisted => "persisted",
            GenerationStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Unparsable(#[from] RepairError),

    #[error(transparent)]
    InvalidShape(#[from] ShapeError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A validated draft together with the provider and model that produced it
#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub draft: T,
    pub provider_id: ProviderConfigId,
    pub model: String,
}

impl<T> Generated<T> {
    pub fn provenance(&self, user_id: UserId) -> Provenance {
        Provenance::ai(user_id, self.provider_id, self.model.clone())
    }
}

/// Prompt in, validated draft out. Shared by all generators.
pub struct GenerationPipeline {
    gateway: Arc<dyn ChatGateway>,
    parser: Arc<dyn ResponseParser>,
}

impl GenerationPipeline {
    pub fn new(gateway: Arc<dyn ChatGateway>, parser: Arc<dyn ResponseParser>) -> Self {
        Self { gateway, parser }
    }

    pub async fn generate<T: ArtifactDraft>(
        &self,
        user_id: UserId,
        provider_id: Option<ProviderConfigId>,
        prompt: GenerationPrompt,
    ) -> Result<Generated<T>, GenerationError> {
        let kind = T::KIND;
        debug!(artifact = %kind, stage = %GenerationStage::PromptBuilt, prompt_chars = prompt.user.len());

        let request = prompt.into_request();
        debug!(artifact = %kind, stage = %GenerationStage::AwaitingProvider);
        let completion = match self.gateway.send_chat_completion(user_id, request, provider_id).await {
            Ok(completion) => completion,
            Err(err) => {
                debug!(artifact = %kind, stage = %GenerationStage::Failed, error = %err);
                return Err(err.into());
            }
        };

        let raw = &completion.response.content;
        debug!(artifact = %kind, stage = %GenerationStage::RawTextReceived, chars = raw.len());

        let value = self.parser.parse(raw).map_err(|err| {
            metrics::counter!("edugen_ai_repair_failures_total", "artifact" => kind.as_str()).increment(1);
            warn!(
                artifact = %kind,
                stage = %GenerationStage::Failed,
                preview = err.preview(),
                "AI response could not be repaired"
            );
            err
        })?;
        debug!(artifact = %kind, stage = %GenerationStage::RepairAttempted);

        let draft = T::from_value(value).map_err(|err| {
            warn!(artifact = %kind, stage = %GenerationStage::Failed, reason = %err.reason, "AI response has the wrong shape");
            err
        })?;
        debug!(artifact = %kind, stage = %GenerationStage::Validated);

        Ok(Generated {
            draft,
            provider_id: completion.provider_id,
            model: completion.response.model,
        })
    }
}

pub(crate) fn log_persisted(kind: ArtifactKind, items: usize) {
    debug!(artifact = %kind, stage = %GenerationStage::Persisted, items);
}

pub(crate) fn check_count(what: &str, count: u32, range: &RangeInclusive<u32>) -> Result<(), GenerationError> {
    if range.contains(&count) {
        Ok(())
    } else {
        Err(GenerationError::InvalidInput(format!(
            "{} must be between {} and {}, got {}",
            what,
            range.start(),
            range.end(),
            count
        )))
    }
}

pub(crate) fn require_text(what: &str, value: &str) -> Result<(), GenerationError> {
    if value.trim().is_empty() {
        Err(GenerationError::InvalidInput(format!("{} must not be empty", what)))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_bounds() {
        assert!(check_count("numHints", 1, &ITEM_COUNT_RANGE).is_ok());
        assert!(check_count("numHints", 10, &ITEM_COUNT_RANGE).is_ok());
        assert!(matches!(
            check_count("numHints", 0, &ITEM_COUNT_RANGE),
            Err(GenerationError::InvalidInput(_))
        ));
        assert!(check_count("numQuestions", 20, &QUIZ_QUESTION_RANGE).is_ok());
        assert!(check_count("numQuestions", 21, &QUIZ_QUESTION_RANGE).is_err());
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(GenerationStage::RawTextReceived.to_string(), "raw_text_received");
        assert_eq!(GenerationStage::Persisted.to_string(), "persisted");
    }
}
